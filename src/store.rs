use crate::domain::Wallet;
use std::sync::RwLock;

/// In-memory table of monitored wallets. Entries are kept in insertion
/// order; the same address may appear more than once (adding an
/// already-monitored address creates a second independent entry).
#[derive(Debug, Default)]
pub struct WalletStore {
    wallets: RwLock<Vec<Wallet>>,
}

impl WalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, wallet: Wallet) {
        self.wallets.write().unwrap().push(wallet);
    }

    /// Deletes every entry for the address. Returns how many were removed.
    pub fn remove(&self, address: &str) -> usize {
        let mut wallets = self.wallets.write().unwrap();
        let before = wallets.len();
        wallets.retain(|w| w.address != address);
        before - wallets.len()
    }

    pub fn get(&self, address: &str) -> Option<Wallet> {
        self.wallets
            .read()
            .unwrap()
            .iter()
            .find(|w| w.address == address)
            .cloned()
    }

    /// Replaces the stored snapshot for every entry with this address.
    /// Returns false without mutating anything if the address was removed
    /// in the interim.
    pub fn commit(&self, address: &str, snapshot: &Wallet) -> bool {
        let mut wallets = self.wallets.write().unwrap();
        let mut committed = false;
        for entry in wallets.iter_mut().filter(|w| w.address == address) {
            *entry = snapshot.clone();
            committed = true;
        }
        committed
    }

    /// Read-only snapshot of all entries.
    pub fn list(&self) -> Vec<Wallet> {
        self.wallets.read().unwrap().clone()
    }

    /// Distinct monitored addresses in insertion order.
    pub fn addresses(&self) -> Vec<String> {
        let wallets = self.wallets.read().unwrap();
        let mut addresses: Vec<String> = Vec::new();
        for wallet in wallets.iter() {
            if !addresses.contains(&wallet.address) {
                addresses.push(wallet.address.clone());
            }
        }
        addresses
    }

    pub fn len(&self) -> usize {
        self.wallets.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.read().unwrap().is_empty()
    }
}
