//! Price oracle error types

use thiserror::Error;

/// Errors that can occur while fetching a quote
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// The oracle does not know the symbol
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// The oracle answered with a price that cannot be used
    #[error("Invalid price for {symbol}: {price}")]
    InvalidPrice { symbol: String, price: String },

    /// No answer within the allowed time
    #[error("Quote timed out after {0}ms")]
    Timeout(u64),

    /// The request never reached the provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with an error
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Result type for oracle operations
pub type OracleResult<T> = std::result::Result<T, OracleError>;
