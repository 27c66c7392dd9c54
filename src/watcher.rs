use crate::alert::{Alert, AlertKind, AlertLog, ThresholdConfig};
use crate::config::AppConfig;
use crate::diff::DiffEngine;
use crate::domain::Wallet;
use crate::error::MonitorError;
use crate::ledger::{fetch_wallet_data, LedgerClient};
use crate::notifier::NotifierHub;
use crate::store::WalletStore;
use crate::utils::{is_valid_address, shorten_address};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Monitoring facade: owns the wallet table, the alert log, the refresh
/// scheduler, and the per-address in-flight guard. Cheap to clone; clones
/// share state.
#[derive(Clone)]
pub struct WalletMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    ledger: Arc<dyn LedgerClient>,
    notifier: NotifierHub,
    store: WalletStore,
    alerts: AlertLog,
    thresholds: RwLock<ThresholdConfig>,
    api_key: RwLock<Option<String>>,
    in_flight: Mutex<HashSet<String>>,
    poll_interval: Duration,
    shutdown: broadcast::Sender<()>,
}

/// Releases the per-address refresh claim when the refresh finishes,
/// whichever way it exits.
struct RefreshGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    address: String,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().unwrap().remove(&self.address);
    }
}

impl WalletMonitor {
    pub fn new(ledger: Arc<dyn LedgerClient>, notifier: NotifierHub, config: &AppConfig) -> Self {
        let (shutdown, _) = broadcast::channel(1);

        Self {
            inner: Arc::new(Inner {
                ledger,
                notifier,
                store: WalletStore::new(),
                alerts: AlertLog::new(),
                thresholds: RwLock::new(config.thresholds()),
                api_key: RwLock::new(Some(config.api_key.clone())),
                in_flight: Mutex::new(HashSet::new()),
                poll_interval: Duration::from_secs(config.poll_interval_secs),
                shutdown,
            }),
        }
    }

    /// Fetches the address once and starts monitoring it. Duplicate
    /// addresses are not rejected; each add creates an independent entry.
    pub async fn add_wallet(&self, address: &str) -> Result<Wallet, MonitorError> {
        let address = normalize_address(address)?;
        let api_key = self.require_api_key()?;

        let fresh = match fetch_wallet_data(self.inner.ledger.as_ref(), &address, &api_key).await {
            Ok(fresh) => fresh,
            Err(e) => {
                self.emit(Alert::new(
                    AlertKind::Error,
                    format!("Failed to add wallet: {e}"),
                ))
                .await;
                return Err(e.into());
            }
        };

        let wallet = Wallet::from_fetch(&address, &fresh);
        self.inner.store.insert(wallet.clone());
        self.emit(Alert::new(
            AlertKind::Success,
            format!("Wallet {} added to monitoring", shorten_address(&address)),
        ))
        .await;

        Ok(wallet)
    }

    /// Deletes every entry for the address. An in-flight refresh is not
    /// awaited; its eventual commit becomes a no-op and its alerts are
    /// discarded.
    pub async fn remove_wallet(&self, address: &str) -> Result<(), MonitorError> {
        let address = normalize_address(address)?;
        if self.inner.store.remove(&address) > 0 {
            self.emit(Alert::new(
                AlertKind::Info,
                format!("Removed {} from monitoring", shorten_address(&address)),
            ))
            .await;
        }
        Ok(())
    }

    /// One fetch-diff-commit pass for a single address. Skipped (returning
    /// no alerts) when a refresh for the same address is already in flight.
    pub async fn refresh_wallet(&self, address: &str) -> Result<Vec<Alert>, MonitorError> {
        let address = normalize_address(address)?;
        let api_key = self.require_api_key()?;

        let Some(_guard) = self.try_claim(&address) else {
            debug!("Refresh already in flight for {}", shorten_address(&address));
            return Ok(Vec::new());
        };

        let old = self.inner.store.get(&address).ok_or_else(|| {
            MonitorError::Validation(format!("{} is not monitored", shorten_address(&address)))
        })?;

        let fresh = match fetch_wallet_data(self.inner.ledger.as_ref(), &address, &api_key).await {
            Ok(fresh) => fresh,
            Err(e) => {
                self.emit(Alert::new(
                    AlertKind::Error,
                    format!("Failed to refresh wallet: {e}"),
                ))
                .await;
                return Err(e.into());
            }
        };

        let config = self.inner.thresholds.read().unwrap().clone();
        let (snapshot, alerts) = DiffEngine::diff(&old, &fresh, &config);

        if !self.inner.store.commit(&address, &snapshot) {
            debug!(
                "{} removed mid-refresh; result discarded",
                shorten_address(&address)
            );
            return Ok(Vec::new());
        }

        for alert in &alerts {
            self.emit(alert.clone()).await;
        }

        Ok(alerts)
    }

    /// Refreshes every monitored address, one independent task per address.
    pub async fn refresh_all(&self) {
        let handles: Vec<_> = self
            .inner
            .store
            .addresses()
            .into_iter()
            .map(|address| {
                let monitor = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = monitor.refresh_wallet(&address).await {
                        debug!("Refresh for {} failed: {}", shorten_address(&address), e);
                    }
                })
            })
            .collect();

        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Spawns the polling loop. Ticks while the monitored set is non-empty
    /// and an API key is configured; other ticks are no-ops. The loop exits
    /// on `stop()`.
    pub fn start(&self) {
        let monitor = self.clone();
        let mut shutdown_rx = self.inner.shutdown.subscribe();

        tokio::spawn(async move {
            let mut ticker = interval(monitor.inner.poll_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if monitor.inner.store.is_empty() || !monitor.has_api_key() {
                            continue;
                        }
                        monitor.refresh_all().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Refresh loop stopped");
                        break;
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        let _ = self.inner.shutdown.send(());
    }

    pub fn set_thresholds(&self, config: ThresholdConfig) {
        *self.inner.thresholds.write().unwrap() = config;
    }

    /// Clearing the key disables future refresh cycles.
    pub fn set_api_key(&self, api_key: Option<String>) {
        *self.inner.api_key.write().unwrap() = api_key;
    }

    pub fn list_wallets(&self) -> Vec<Wallet> {
        self.inner.store.list()
    }

    pub fn list_alerts(&self) -> Vec<Alert> {
        self.inner.alerts.list()
    }

    async fn emit(&self, alert: Alert) {
        self.inner.alerts.push(alert.clone());
        if let Err(e) = self.inner.notifier.send(&alert).await {
            warn!("Notifier failed: {}", e);
        }
    }

    fn require_api_key(&self) -> Result<String, MonitorError> {
        self.inner
            .api_key
            .read()
            .unwrap()
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| MonitorError::Validation("no API key configured".to_string()))
    }

    fn has_api_key(&self) -> bool {
        self.require_api_key().is_ok()
    }

    fn try_claim(&self, address: &str) -> Option<RefreshGuard<'_>> {
        let mut in_flight = self.inner.in_flight.lock().unwrap();
        if in_flight.insert(address.to_string()) {
            Some(RefreshGuard {
                in_flight: &self.inner.in_flight,
                address: address.to_string(),
            })
        } else {
            None
        }
    }
}

fn normalize_address(address: &str) -> Result<String, MonitorError> {
    let trimmed = address.trim();
    if !is_valid_address(trimmed) {
        return Err(MonitorError::Validation(format!(
            "invalid address: {trimmed:?}"
        )));
    }
    Ok(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TxRecord;
    use crate::error::FetchError;
    use crate::notifier::ConsoleNotifier;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const WALLET: &str = "0xf977814e90da44bfa03b6295a0616a897441acec";
    const OTHER: &str = "0x28c6c06298d514db089934071355e5743bf21d60";

    const ONE_ETH: u128 = 1_000_000_000_000_000_000;

    #[derive(Default)]
    struct MockLedger {
        balance_wei: Mutex<u128>,
        txs: Mutex<Vec<TxRecord>>,
        fail: AtomicBool,
        balance_calls: AtomicUsize,
        gated: AtomicBool,
        gate: Notify,
    }

    impl MockLedger {
        fn set_balance(&self, wei: u128) {
            *self.balance_wei.lock().unwrap() = wei;
        }

        fn push_tx(&self, hash: &str, from: &str, value_wei: u128) {
            self.txs.lock().unwrap().insert(
                0,
                TxRecord {
                    hash: hash.to_string(),
                    from: from.to_string(),
                    value_wei,
                },
            );
        }
    }

    #[async_trait]
    impl LedgerClient for MockLedger {
        async fn balance(&self, _address: &str, _api_key: &str) -> Result<u128, FetchError> {
            self.balance_calls.fetch_add(1, Ordering::SeqCst);
            if self.gated.load(Ordering::SeqCst) {
                self.gate.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::new("connection refused"));
            }
            Ok(*self.balance_wei.lock().unwrap())
        }

        async fn transactions(
            &self,
            _address: &str,
            _api_key: &str,
        ) -> Result<Vec<TxRecord>, FetchError> {
            Ok(self.txs.lock().unwrap().clone())
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            api_url: String::new(),
            api_key: "test-key".to_string(),
            watch_addresses: Vec::new(),
            poll_interval_secs: 1,
            alert_on_any_tx: true,
            min_tx_value: Decimal::ONE,
            max_tx_value: Decimal::ONE_HUNDRED,
            telegram_bot_token: None,
            telegram_chat_id: None,
        }
    }

    fn test_monitor(ledger: Arc<MockLedger>) -> WalletMonitor {
        WalletMonitor::new(
            ledger,
            NotifierHub::new(ConsoleNotifier::new(), None),
            &test_config(),
        )
    }

    /// Mock with a two-ETH balance and three prior transactions.
    fn seeded_ledger() -> Arc<MockLedger> {
        let ledger = Arc::new(MockLedger::default());
        ledger.set_balance(2 * ONE_ETH);
        ledger.push_tx("0x01", OTHER, ONE_ETH);
        ledger.push_tx("0x02", OTHER, ONE_ETH);
        ledger.push_tx("0x03", OTHER, ONE_ETH);
        ledger
    }

    #[tokio::test]
    async fn add_wallet_creates_snapshot_and_success_alert() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(ledger);

        let wallet = monitor.add_wallet(WALLET).await.unwrap();
        assert_eq!(wallet.balance, Decimal::TWO);
        assert_eq!(wallet.tx_count, 3);

        assert_eq!(monitor.list_wallets().len(), 1);
        let alerts = monitor.list_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Success);
        assert!(alerts[0].message.contains("added to monitoring"));
    }

    #[tokio::test]
    async fn add_wallet_normalizes_address_case() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(ledger);

        let wallet = monitor
            .add_wallet("0xF977814e90dA44bFA03b6295A0616a897441aceC")
            .await
            .unwrap();
        assert_eq!(wallet.address, WALLET);
    }

    #[tokio::test]
    async fn add_wallet_rejects_malformed_address_before_any_fetch() {
        let ledger = Arc::new(MockLedger::default());
        let monitor = test_monitor(Arc::clone(&ledger));

        let err = monitor.add_wallet("not-an-address").await.unwrap_err();
        assert!(matches!(err, MonitorError::Validation(_)));
        assert_eq!(ledger.balance_calls.load(Ordering::SeqCst), 0);
        assert!(monitor.list_alerts().is_empty());
    }

    #[tokio::test]
    async fn add_wallet_requires_api_key() {
        let ledger = Arc::new(MockLedger::default());
        let monitor = test_monitor(Arc::clone(&ledger));
        monitor.set_api_key(None);

        let err = monitor.add_wallet(WALLET).await.unwrap_err();
        assert!(matches!(err, MonitorError::Validation(_)));
        assert_eq!(ledger.balance_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn add_wallet_surfaces_fetch_failure() {
        let ledger = Arc::new(MockLedger::default());
        ledger.fail.store(true, Ordering::SeqCst);
        let monitor = test_monitor(ledger);

        let err = monitor.add_wallet(WALLET).await.unwrap_err();
        assert!(matches!(err, MonitorError::Fetch(_)));
        assert!(monitor.list_wallets().is_empty());

        let alerts = monitor.list_alerts();
        assert_eq!(alerts[0].kind, AlertKind::Error);
        assert_eq!(alerts[0].message, "Failed to add wallet: connection refused");
    }

    #[tokio::test]
    async fn adding_the_same_address_twice_creates_independent_entries() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(ledger);

        monitor.add_wallet(WALLET).await.unwrap();
        monitor.add_wallet(WALLET).await.unwrap();
        assert_eq!(monitor.list_wallets().len(), 2);
    }

    #[tokio::test]
    async fn remove_wallet_deletes_entries_and_emits_info() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(ledger);

        monitor.add_wallet(WALLET).await.unwrap();
        monitor.remove_wallet(WALLET).await.unwrap();

        assert!(monitor.list_wallets().is_empty());
        let alerts = monitor.list_alerts();
        assert_eq!(alerts[0].kind, AlertKind::Info);
        assert!(alerts[0].message.contains("Removed"));
    }

    #[tokio::test]
    async fn refresh_detects_balance_change_and_new_transaction() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(Arc::clone(&ledger));
        monitor.add_wallet(WALLET).await.unwrap();

        ledger.set_balance(2 * ONE_ETH + ONE_ETH / 2);
        ledger.push_tx("0xaa", "0xF977814e90dA44bFA03b6295A0616a897441aceC", ONE_ETH / 2);

        let alerts = monitor.refresh_wallet(WALLET).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::Success);
        assert!(alerts[0].message.contains("increased by 0.5000 ETH"));
        assert_eq!(alerts[1].kind, AlertKind::Info);
        assert_eq!(alerts[1].message, "New transaction: 0.5 ETH sent");
        assert_eq!(alerts[1].tx_hash.as_deref(), Some("0xaa"));

        let wallet = monitor.list_wallets().into_iter().next().unwrap();
        assert_eq!(wallet.balance, Decimal::new(25, 1));
        assert_eq!(wallet.tx_count, 4);
    }

    #[tokio::test]
    async fn refresh_with_unchanged_data_yields_no_alerts() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(ledger);
        monitor.add_wallet(WALLET).await.unwrap();
        let before = monitor.list_alerts().len();

        let alerts = monitor.refresh_wallet(WALLET).await.unwrap();
        assert!(alerts.is_empty());
        assert_eq!(monitor.list_alerts().len(), before);
    }

    #[tokio::test]
    async fn refresh_failure_retains_prior_snapshot() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(Arc::clone(&ledger));
        monitor.add_wallet(WALLET).await.unwrap();

        ledger.fail.store(true, Ordering::SeqCst);
        let err = monitor.refresh_wallet(WALLET).await.unwrap_err();
        assert!(matches!(err, MonitorError::Fetch(_)));

        let wallet = monitor.list_wallets().into_iter().next().unwrap();
        assert_eq!(wallet.balance, Decimal::TWO);
        assert_eq!(
            monitor.list_alerts()[0].message,
            "Failed to refresh wallet: connection refused"
        );
    }

    #[tokio::test]
    async fn threshold_update_applies_to_next_refresh() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(Arc::clone(&ledger));
        monitor.add_wallet(WALLET).await.unwrap();

        monitor.set_thresholds(ThresholdConfig {
            alert_on_any_tx: false,
            min_value: Decimal::ONE,
            max_value: Decimal::ONE_HUNDRED,
        });

        // 0.2 ETH is genuinely new but below the floor
        ledger.push_tx("0xaa", OTHER, ONE_ETH / 5);
        let alerts = monitor.refresh_wallet(WALLET).await.unwrap();
        assert!(alerts.is_empty());

        let wallet = monitor.list_wallets().into_iter().next().unwrap();
        assert_eq!(wallet.tx_count, 4);
    }

    #[tokio::test]
    async fn refresh_for_unmonitored_address_is_rejected() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(ledger);

        let err = monitor.refresh_wallet(WALLET).await.unwrap_err();
        assert!(matches!(err, MonitorError::Validation(_)));
    }

    #[tokio::test]
    async fn concurrent_refresh_for_same_address_is_skipped() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(Arc::clone(&ledger));
        monitor.add_wallet(WALLET).await.unwrap();
        let calls_after_add = ledger.balance_calls.load(Ordering::SeqCst);

        ledger.gated.store(true, Ordering::SeqCst);
        let racing = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.refresh_wallet(WALLET).await })
        };
        // Let the spawned refresh claim the address and park on the gate.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let skipped = monitor.refresh_wallet(WALLET).await.unwrap();
        assert!(skipped.is_empty());
        assert_eq!(
            ledger.balance_calls.load(Ordering::SeqCst),
            calls_after_add + 1
        );

        ledger.gated.store(false, Ordering::SeqCst);
        ledger.gate.notify_one();
        racing.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn refresh_completing_after_removal_is_discarded() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(Arc::clone(&ledger));
        monitor.add_wallet(WALLET).await.unwrap();

        ledger.gated.store(true, Ordering::SeqCst);
        ledger.set_balance(5 * ONE_ETH);
        let in_flight = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.refresh_wallet(WALLET).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        monitor.remove_wallet(WALLET).await.unwrap();
        ledger.gated.store(false, Ordering::SeqCst);
        ledger.gate.notify_one();

        let alerts = in_flight.await.unwrap().unwrap();
        assert!(alerts.is_empty());
        assert!(monitor.list_wallets().is_empty());
        // The balance jump must not have produced an alert.
        assert!(!monitor
            .list_alerts()
            .iter()
            .any(|a| a.message.contains("Balance")));
    }

    #[tokio::test]
    async fn scheduler_refreshes_on_tick() {
        let ledger = seeded_ledger();
        let monitor = test_monitor(Arc::clone(&ledger));
        monitor.add_wallet(WALLET).await.unwrap();
        let calls_after_add = ledger.balance_calls.load(Ordering::SeqCst);

        monitor.start();
        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(ledger.balance_calls.load(Ordering::SeqCst) > calls_after_add);

        monitor.stop();
    }
}
