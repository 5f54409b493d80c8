//! Common types and utilities for StockRewards
//!
//! This crate provides the ledger and domain types shared by the store,
//! the settlement engine and the HTTP API.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Rewards, ledger legs, account categories and holdings
//! - [`decimal`] - Conversions between `BigDecimal` and wire numbers

pub mod decimal;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
