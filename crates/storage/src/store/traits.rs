//! LedgerStore and LedgerTransaction trait definitions

use async_trait::async_trait;
use common::types::{Holding, LedgerEntry, LedgerLeg, NewReward, Reward, RewardId, TimeWindow, UserId};

use crate::error::Result;

/// LedgerStore trait - defines the interface for reward and ledger storage
///
/// All writes happen inside a [`LedgerTransaction`] obtained from
/// [`LedgerStore::begin`]. Read methods only observe committed rows.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Start a new atomic unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>>;

    /// Sum reward quantities per symbol for a user
    ///
    /// # Arguments
    /// * `user_id` - The user whose rewards are summed
    /// * `window` - Restrict to rewards settled inside this interval
    ///
    /// # Returns
    /// One holding per symbol, ordered by symbol
    async fn holdings(&self, user_id: UserId, window: Option<TimeWindow>) -> Result<Vec<Holding>>;

    /// Get a committed reward by ID
    async fn get_reward(&self, reward_id: RewardId) -> Result<Option<Reward>>;

    /// Get the ledger legs posted for a reward, in posting order
    async fn entries_for_reward(&self, reward_id: RewardId) -> Result<Vec<LedgerEntry>>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

/// One open transaction against the ledger
///
/// Nothing written through a transaction is visible to readers until
/// [`commit`](LedgerTransaction::commit) succeeds. Dropping a transaction
/// without committing discards its writes.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Insert a reward and return it with its generated ID
    async fn insert_reward(&mut self, reward: &NewReward) -> Result<Reward>;

    /// Insert one ledger leg owned by `reward_id`
    async fn insert_entry(&mut self, reward_id: RewardId, leg: &LedgerLeg) -> Result<LedgerEntry>;

    /// Make every write of this transaction visible at once
    async fn commit(&mut self) -> Result<()>;

    /// Discard every write of this transaction
    async fn rollback(&mut self) -> Result<()>;
}
