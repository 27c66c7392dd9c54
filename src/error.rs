use thiserror::Error;

/// Uniform failure for ledger-query calls. The monitor does not distinguish
/// a network failure from an application-level rejection; both carry a
/// human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct FetchError {
    pub reason: String,
}

impl FetchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by monitor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// Malformed address or missing credential; rejected before any network
    /// call, no state is mutated.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The ledger query failed; the prior snapshot is retained.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
}
