//! In-memory ledger store implementation

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use common::types::{
    AccountType, Holding, LedgerEntry, LedgerLeg, NewReward, Reward, RewardId, TimeWindow, UserId,
};

use crate::error::{Result, StorageError};
use crate::store::traits::{LedgerStore, LedgerTransaction};

/// Place where the in-memory store can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// Fail inserting the reward row
    RewardInsert,
    /// Fail inserting the ledger leg of this account category
    EntryInsert(AccountType),
    /// Fail at commit, after every insert succeeded
    Commit,
}

#[derive(Default)]
struct Tables {
    rewards: BTreeMap<RewardId, Reward>,
    entries: Vec<LedgerEntry>,
}

struct Shared {
    tables: RwLock<Tables>,
    next_reward_id: AtomicI64,
    next_entry_id: AtomicI64,
    faults: RwLock<HashSet<FaultPoint>>,
}

impl Shared {
    fn check_fault(&self, point: FaultPoint) -> Result<()> {
        if self.faults.read().contains(&point) {
            return Err(StorageError::Injected(format!("{:?}", point)));
        }
        Ok(())
    }
}

/// In-memory ledger store for testing and development
///
/// Committed rows live behind a single lock. Each transaction buffers its
/// rows privately and publishes them under one write lock at commit, so
/// readers never see a reward without its legs. Identifiers come from
/// sequences and, like database sequences, are not reused after a rollback.
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    shared: Arc<Shared>,
}

impl InMemoryLedgerStore {
    /// Create a new in-memory ledger store
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                next_reward_id: AtomicI64::new(1),
                next_entry_id: AtomicI64::new(1),
                faults: RwLock::new(HashSet::new()),
            }),
        }
    }

    /// Configure a failure at the given point
    pub fn with_fault(self, point: FaultPoint) -> Self {
        self.inject_fault(point);
        self
    }

    /// Start failing at the given point
    pub fn inject_fault(&self, point: FaultPoint) {
        self.shared.faults.write().insert(point);
    }

    /// Remove every configured failure
    pub fn clear_faults(&self) {
        self.shared.faults.write().clear();
    }

    /// Number of committed rewards
    pub fn reward_count(&self) -> usize {
        self.shared.tables.read().rewards.len()
    }

    /// Number of committed ledger entries
    pub fn entry_count(&self) -> usize {
        self.shared.tables.read().entries.len()
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            shared: Arc::clone(&self.shared),
            rewards: Vec::new(),
            entries: Vec::new(),
            finished: false,
        }))
    }

    async fn holdings(&self, user_id: UserId, window: Option<TimeWindow>) -> Result<Vec<Holding>> {
        let tables = self.shared.tables.read();

        let mut sums: BTreeMap<String, BigDecimal> = BTreeMap::new();
        for reward in tables.rewards.values() {
            if reward.user_id != user_id {
                continue;
            }
            if let Some(window) = window {
                if !window.contains(reward.rewarded_at) {
                    continue;
                }
            }
            let sum = sums
                .entry(reward.stock_symbol.clone())
                .or_insert_with(BigDecimal::zero);
            *sum += &reward.quantity;
        }

        Ok(sums
            .into_iter()
            .map(|(stock_symbol, quantity)| Holding { stock_symbol, quantity })
            .collect())
    }

    async fn get_reward(&self, reward_id: RewardId) -> Result<Option<Reward>> {
        Ok(self.shared.tables.read().rewards.get(&reward_id).cloned())
    }

    async fn entries_for_reward(&self, reward_id: RewardId) -> Result<Vec<LedgerEntry>> {
        let tables = self.shared.tables.read();
        Ok(tables
            .entries
            .iter()
            .filter(|e| e.reward_id == reward_id)
            .cloned()
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

struct InMemoryTransaction {
    shared: Arc<Shared>,
    rewards: Vec<Reward>,
    entries: Vec<LedgerEntry>,
    finished: bool,
}

impl InMemoryTransaction {
    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(StorageError::Transaction("transaction already finished".to_string()));
        }
        Ok(())
    }

    fn discard(&mut self) {
        self.rewards.clear();
        self.entries.clear();
        self.finished = true;
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn insert_reward(&mut self, reward: &NewReward) -> Result<Reward> {
        self.ensure_open()?;
        self.shared.check_fault(FaultPoint::RewardInsert)?;

        let reward_id = self.shared.next_reward_id.fetch_add(1, Ordering::SeqCst);
        let reward = reward.clone().with_id(reward_id);
        self.rewards.push(reward.clone());
        Ok(reward)
    }

    async fn insert_entry(&mut self, reward_id: RewardId, leg: &LedgerLeg) -> Result<LedgerEntry> {
        self.ensure_open()?;
        self.shared.check_fault(FaultPoint::EntryInsert(leg.account_type))?;

        // ledger.reward_id references rewards(id)
        let known = self.rewards.iter().any(|r| r.reward_id == reward_id)
            || self.shared.tables.read().rewards.contains_key(&reward_id);
        if !known {
            return Err(StorageError::Query(format!(
                "ledger entry references unknown reward {}",
                reward_id
            )));
        }

        let entry_id = self.shared.next_entry_id.fetch_add(1, Ordering::SeqCst);
        let entry = leg.clone().into_entry(entry_id, reward_id);
        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        if let Err(e) = self.shared.check_fault(FaultPoint::Commit) {
            self.discard();
            return Err(e);
        }

        let mut tables = self.shared.tables.write();
        for reward in self.rewards.drain(..) {
            tables.rewards.insert(reward.reward_id, reward);
        }
        tables.entries.append(&mut self.entries);
        drop(tables);

        self.finished = true;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.discard();
        Ok(())
    }
}
