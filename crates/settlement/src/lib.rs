//! Reward settlement for StockRewards
//!
//! This crate turns a reward grant into ledger state and values the result.
//!
//! # Components
//!
//! - [`SettlementEngine`] - quotes the stock once, computes cost and fees,
//!   and posts the reward with its three ledger legs in one transaction
//! - [`ValuationAggregator`] - read-only holdings, today's holdings and
//!   portfolio value against fresh quotes
//!
//! # Feature Flags
//!
//! - `api` - Enable HTTP API

pub mod engine;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod quotes;
pub mod valuation;

#[cfg(feature = "api")]
pub mod api;

pub use engine::{RewardDetail, SettlementEngine, SettlementReceipt};
pub use error::{Result, SettlementError};
pub use policy::{SettlementPolicy, ValuationPolicy};
pub use valuation::{today_window, PortfolioStats, ValuationAggregator};
