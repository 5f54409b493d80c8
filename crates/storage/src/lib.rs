//! Ledger storage for StockRewards
//!
//! Rewards and their ledger legs are written only through a
//! [`LedgerTransaction`], so a settlement is either fully visible or not
//! visible at all. Reads go straight to the [`LedgerStore`] and only ever
//! see committed rows.
//!
//! # Feature Flags
//!
//! - `postgres` - Enable PostgreSQL storage

pub mod error;
pub mod store;

pub use error::{Result, StorageError};
pub use store::memory::{FaultPoint, InMemoryLedgerStore};
pub use store::traits::{LedgerStore, LedgerTransaction};

#[cfg(feature = "postgres")]
pub use store::postgres::PostgresLedgerStore;
