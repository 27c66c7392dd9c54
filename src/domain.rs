use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Transaction page size requested from the ledger API. A wallet's
/// `transactions` field is a window of at most this many entries, not
/// full history.
pub const TX_WINDOW: usize = 10;

/// Converts an integer wei amount into an ETH decimal with 4-place
/// precision. All balance and value comparisons operate on this decimal,
/// never on the raw wei.
pub fn wei_to_eth(wei: u128) -> Decimal {
    let mantissa = i128::try_from(wei).unwrap_or(i128::MAX);
    Decimal::try_from_i128_with_scale(mantissa, 18)
        .unwrap_or(Decimal::MAX)
        .round_dp(4)
}

/// A transaction as returned by the ledger API, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    pub hash: String,
    pub from: String,
    pub value_wei: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Sent => write!(f, "sent"),
            Direction::Received => write!(f, "received"),
        }
    }
}

/// A classified transaction in a wallet's window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx {
    pub hash: String,
    pub from: String,
    pub value: Decimal,
    pub direction: Direction,
}

impl Tx {
    /// Classifies a raw record against the owning wallet: a transaction is
    /// `Sent` when its `from` field equals the wallet address
    /// (case-insensitive), otherwise `Received`.
    pub fn classify(record: &TxRecord, wallet_address: &str) -> Self {
        let direction = if record.from.eq_ignore_ascii_case(wallet_address) {
            Direction::Sent
        } else {
            Direction::Received
        };

        Self {
            hash: record.hash.clone(),
            from: record.from.clone(),
            value: wei_to_eth(record.value_wei),
            direction,
        }
    }
}

/// The result of one fetch pass for a single address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub balance: Decimal,
    pub tx_count: u32,
    pub transactions: Vec<TxRecord>,
}

/// Last committed state of a monitored address.
#[derive(Debug, Clone, PartialEq)]
pub struct Wallet {
    /// Lowercase-normalized.
    pub address: String,
    pub balance: Decimal,
    pub tx_count: u32,
    pub last_checked: DateTime<Utc>,
    /// Most-recent-first, length ≤ `TX_WINDOW`.
    pub transactions: Vec<Tx>,
}

impl Wallet {
    pub fn from_fetch(address: &str, fetch: &FetchResult) -> Self {
        let transactions = fetch
            .transactions
            .iter()
            .take(TX_WINDOW)
            .map(|record| Tx::classify(record, address))
            .collect();

        Self {
            address: address.to_string(),
            balance: fetch.balance,
            tx_count: fetch.tx_count,
            last_checked: Utc::now(),
            transactions,
        }
    }
}
