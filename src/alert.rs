use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::RwLock;

/// Maximum number of alerts retained; inserting beyond this drops the oldest.
pub const ALERT_LOG_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Warning,
    Error,
    Info,
}

impl AlertKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            AlertKind::Success => "✅",
            AlertKind::Warning => "⚠️",
            AlertKind::Error => "❌",
            AlertKind::Info => "ℹ️",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: Option<String>,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            tx_hash: None,
        }
    }

    pub fn with_tx(kind: AlertKind, message: impl Into<String>, tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: Some(tx_hash.into()),
            ..Self::new(kind, message)
        }
    }
}

/// Value-range policy for per-transaction alerts. Balance-delta alerts are
/// never filtered by this policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdConfig {
    pub alert_on_any_tx: bool,
    pub min_value: Decimal,
    pub max_value: Decimal,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            alert_on_any_tx: true,
            min_value: Decimal::ONE,
            max_value: Decimal::ONE_HUNDRED,
        }
    }
}

impl ThresholdConfig {
    /// Whether a transaction of this value is alert-worthy. Bounds are
    /// inclusive on both ends.
    pub fn accepts(&self, value: Decimal) -> bool {
        self.alert_on_any_tx || (value >= self.min_value && value <= self.max_value)
    }
}

/// Bounded, newest-first log of alerts. Writes are serialized; listing
/// clones a snapshot so readers never hold the lock past one read.
#[derive(Debug, Default)]
pub struct AlertLog {
    entries: RwLock<VecDeque<Alert>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, alert: Alert) {
        let mut entries = self.entries.write().unwrap();
        entries.push_front(alert);
        entries.truncate(ALERT_LOG_CAP);
    }

    /// Newest-first snapshot.
    pub fn list(&self) -> Vec<Alert> {
        self.entries.read().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}
