//! Price oracles for StockRewards
//!
//! The settlement engine and the valuation aggregator only see the
//! [`PriceOracle`] trait. Quotes are treated as untrusted: every
//! implementation rejects non-positive prices, and callers re-check.
//!
//! # Implementations
//!
//! - [`StaticPriceOracle`] - fixed price table from configuration
//! - [`MockPriceOracle`] - test double with failure injection and call counts
//! - `HttpPriceOracle` - remote quote service (feature `client`)

pub mod error;
pub mod mock;
pub mod oracle;
pub mod static_table;

#[cfg(feature = "client")]
pub mod http;

pub use error::{OracleError, OracleResult};
pub use mock::MockPriceOracle;
pub use oracle::{PriceOracle, Quote};
pub use static_table::StaticPriceOracle;

#[cfg(feature = "client")]
pub use http::HttpPriceOracle;
