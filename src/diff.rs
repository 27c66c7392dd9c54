use crate::alert::{Alert, AlertKind, ThresholdConfig};
use crate::domain::{FetchResult, Tx, Wallet};
use crate::utils::shorten_address;
use rust_decimal::Decimal;

/// Compares a wallet's stored snapshot against a fresh fetch result and
/// produces the alerts describing what changed, plus the snapshot to commit.
pub struct DiffEngine;

impl DiffEngine {
    /// The balance-delta alert, if any, always precedes transaction alerts.
    /// The returned snapshot reflects the fetch result verbatim; a dropped
    /// transaction count is flagged but still committed as received.
    pub fn diff(
        old: &Wallet,
        fresh: &FetchResult,
        config: &ThresholdConfig,
    ) -> (Wallet, Vec<Alert>) {
        let mut alerts = Vec::new();
        let short = shorten_address(&old.address);

        let delta = fresh.balance - old.balance;
        if !delta.is_zero() {
            let (kind, verb) = if delta > Decimal::ZERO {
                (AlertKind::Success, "increased")
            } else {
                (AlertKind::Warning, "decreased")
            };
            alerts.push(Alert::new(
                kind,
                format!("Balance {verb} by {:.4} ETH for {short}", delta.abs()),
            ));
        }

        let new_count = i64::from(fresh.tx_count) - i64::from(old.tx_count);
        if new_count < 0 {
            // The upstream ledger never loses transactions; a shrinking
            // count is a data anomaly, not a valid transition.
            alerts.push(Alert::new(
                AlertKind::Warning,
                format!(
                    "Transaction count for {short} dropped from {} to {}",
                    old.tx_count, fresh.tx_count
                ),
            ));
        } else if new_count > 0 {
            // The page is most-recent-first, so the first new_count entries
            // are the newly observed transactions.
            for record in fresh.transactions.iter().take(new_count as usize) {
                let tx = Tx::classify(record, &old.address);
                if config.accepts(tx.value) {
                    alerts.push(Alert::with_tx(
                        AlertKind::Info,
                        format!("New transaction: {} ETH {}", tx.value.normalize(), tx.direction),
                        tx.hash.clone(),
                    ));
                }
            }
        }

        (Wallet::from_fetch(&old.address, fresh), alerts)
    }
}
