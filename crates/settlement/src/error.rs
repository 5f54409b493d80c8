//! Settlement error types

use storage::StorageError;
use thiserror::Error;

/// Errors that can occur during settlement and valuation
///
/// Every variant except `NotFound` guarantees the ledger was left exactly as
/// it was before the call.
#[derive(Error, Debug)]
pub enum SettlementError {
    /// Malformed or out-of-range input, rejected before any side effect
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The oracle failed, timed out, or returned an unusable price
    #[error("Quote unavailable for {symbol}: {reason}")]
    QuoteUnavailable { symbol: String, reason: String },

    /// A store operation failed and the transaction was rolled back
    #[error("Persistence error: {0}")]
    PersistenceError(#[from] StorageError),

    /// Unknown reward
    #[error("Not found: {0}")]
    NotFound(String),
}

impl SettlementError {
    /// Create an invalid request error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Short label used for the failure metric
    pub fn reason(&self) -> &'static str {
        match self {
            SettlementError::InvalidRequest(_) => "invalid_request",
            SettlementError::QuoteUnavailable { .. } => "quote_unavailable",
            SettlementError::PersistenceError(_) => "persistence",
            SettlementError::NotFound(_) => "not_found",
        }
    }
}

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, SettlementError>;
