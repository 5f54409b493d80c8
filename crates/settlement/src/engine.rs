//! Reward Settlement Engine - turns a reward grant into ledger state
//!
//! Flow of one settlement:
//! 1. Validate the request (no side effects)
//! 2. Quote the symbol once, before any transaction is open
//! 3. Compute stock cost, fee and total company cost
//! 4. In one transaction: insert the reward, insert the three legs,
//!    re-check the balance, commit
//!
//! Step 4 runs on its own task so a caller that goes away mid-request cannot
//! leave a transaction half done.

use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use common::types::{
    fits_integer_digits, CostBreakdown, LedgerEntry, NewReward, Reward, RewardId, SettlementLegs,
    UserId, AMOUNT_INTEGER_DIGITS, AMOUNT_SCALE, QUANTITY_INTEGER_DIGITS,
};
use market_data::PriceOracle;
use storage::{LedgerStore, LedgerTransaction, StorageError};

use crate::error::{Result, SettlementError};
use crate::metrics::SettlementMetrics;
use crate::policy::SettlementPolicy;
use crate::quotes::fetch_quote;

/// Longest accepted stock symbol
pub const MAX_SYMBOL_LEN: usize = 32;

/// Outcome of a committed settlement
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReceipt {
    pub reward_id: RewardId,
    pub user_id: UserId,
    pub stock_symbol: String,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub stock_cost: BigDecimal,
    pub fee: BigDecimal,
    pub total_company_cost: BigDecimal,
    pub currency: String,
}

/// A committed reward with the legs posted for it
#[derive(Debug, Clone, PartialEq)]
pub struct RewardDetail {
    pub reward: Reward,
    pub legs: Vec<LedgerEntry>,
}

/// Settlement Engine - posts rewards and their ledger legs atomically
pub struct SettlementEngine {
    store: Arc<dyn LedgerStore>,
    oracle: Arc<dyn PriceOracle>,
    policy: SettlementPolicy,
    metrics: SettlementMetrics,
}

impl SettlementEngine {
    /// Create a new SettlementEngine
    pub fn new(
        store: Arc<dyn LedgerStore>,
        oracle: Arc<dyn PriceOracle>,
        policy: SettlementPolicy,
    ) -> Self {
        Self {
            store,
            oracle,
            policy,
            metrics: SettlementMetrics::new(),
        }
    }

    /// The policy every settlement uses
    pub fn policy(&self) -> &SettlementPolicy {
        &self.policy
    }

    /// Settle a reward of `quantity` shares of `symbol` for `user_id`
    ///
    /// On success exactly one reward and its three legs are committed. On
    /// any error nothing is visible.
    #[instrument(skip(self, quantity), fields(quantity = %quantity))]
    pub async fn settle(
        &self,
        user_id: UserId,
        symbol: &str,
        quantity: BigDecimal,
    ) -> Result<SettlementReceipt> {
        let started = Instant::now();
        let result = self.settle_inner(user_id, symbol, quantity).await;

        match &result {
            Ok(receipt) => {
                self.metrics.record_settled(started.elapsed());
                info!(
                    user_id,
                    symbol = %receipt.stock_symbol,
                    cost = %receipt.total_company_cost,
                    currency = %receipt.currency,
                    reward_id = receipt.reward_id,
                    "Reward settled"
                );
            }
            Err(e) => {
                self.metrics.record_failure(e.reason());
                warn!(user_id, symbol, error = %e, "Settlement failed");
            }
        }

        result
    }

    async fn settle_inner(
        &self,
        user_id: UserId,
        symbol: &str,
        quantity: BigDecimal,
    ) -> Result<SettlementReceipt> {
        let symbol = validate_request(user_id, symbol, &quantity)?;

        let quote = fetch_quote(self.oracle.as_ref(), &symbol, self.policy.quote_timeout).await?;

        let cost = CostBreakdown::compute(&quantity, &quote.price, &self.policy.fee_rate);
        check_amounts(&cost)?;
        let legs = SettlementLegs::post(&symbol, &quantity, &cost, &self.policy.currency);
        let reward = NewReward {
            user_id,
            stock_symbol: symbol.clone(),
            quantity: quantity.clone(),
            rewarded_at: Utc::now(),
        };

        let store = Arc::clone(&self.store);
        let total = cost.total_company_cost.clone();
        let currency = self.policy.currency.clone();
        let posting = tokio::spawn(async move {
            post_settlement(store.as_ref(), reward, legs, total, currency).await
        });

        let reward = posting.await.map_err(|e| {
            error!(error = %e, "Settlement task did not complete");
            SettlementError::PersistenceError(StorageError::Transaction(e.to_string()))
        })??;

        Ok(SettlementReceipt {
            reward_id: reward.reward_id,
            user_id,
            stock_symbol: symbol,
            quantity,
            price: cost.price,
            stock_cost: cost.stock_cost,
            fee: cost.fee,
            total_company_cost: cost.total_company_cost,
            currency: self.policy.currency.clone(),
        })
    }

    /// Get a committed reward and its ledger legs
    pub async fn get_reward(&self, reward_id: RewardId) -> Result<RewardDetail> {
        let reward = self
            .store
            .get_reward(reward_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("reward {}", reward_id)))?;
        let legs = self.store.entries_for_reward(reward_id).await?;
        Ok(RewardDetail { reward, legs })
    }
}

/// Check the request and return the normalized symbol
fn validate_request(user_id: UserId, symbol: &str, quantity: &BigDecimal) -> Result<String> {
    if user_id <= 0 {
        return Err(SettlementError::invalid("user_id must be positive"));
    }

    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(SettlementError::invalid("stock_symbol is required"));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(SettlementError::invalid(format!(
            "stock_symbol longer than {} characters",
            MAX_SYMBOL_LEN
        )));
    }
    if symbol.chars().any(char::is_whitespace) {
        return Err(SettlementError::invalid("stock_symbol must not contain whitespace"));
    }

    if *quantity <= BigDecimal::zero() {
        return Err(SettlementError::invalid("quantity must be greater than 0"));
    }
    if quantity.normalized().as_bigint_and_exponent().1 > AMOUNT_SCALE {
        return Err(SettlementError::invalid(format!(
            "quantity has more than {} decimal places",
            AMOUNT_SCALE
        )));
    }
    if !fits_integer_digits(quantity, QUANTITY_INTEGER_DIGITS) {
        return Err(SettlementError::invalid(format!(
            "quantity has more than {} integer digits",
            QUANTITY_INTEGER_DIGITS
        )));
    }

    Ok(symbol.to_string())
}

/// Reject costs the ledger amount column cannot hold
fn check_amounts(cost: &CostBreakdown) -> Result<()> {
    for (name, amount) in [("stock cost", &cost.stock_cost), ("fee", &cost.fee)] {
        if !fits_integer_digits(amount, AMOUNT_INTEGER_DIGITS) {
            return Err(SettlementError::invalid(format!(
                "{} {} has more than {} integer digits",
                name, amount, AMOUNT_INTEGER_DIGITS
            )));
        }
    }
    Ok(())
}

/// Write one settlement inside a single transaction
///
/// Every failure after `begin` rolls back before returning.
async fn post_settlement(
    store: &dyn LedgerStore,
    reward: NewReward,
    legs: SettlementLegs,
    total_company_cost: BigDecimal,
    currency: String,
) -> Result<Reward> {
    let mut tx = store.begin().await?;

    match write_settlement(tx.as_mut(), &reward, &legs, &total_company_cost, &currency).await {
        Ok(reward) => {
            tx.commit().await?;
            Ok(reward)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn write_settlement(
    tx: &mut dyn LedgerTransaction,
    reward: &NewReward,
    legs: &SettlementLegs,
    total_company_cost: &BigDecimal,
    currency: &str,
) -> Result<Reward> {
    let inserted = tx.insert_reward(reward).await?;

    let mut written = Vec::with_capacity(legs.legs.len());
    for leg in legs.iter() {
        let entry = tx.insert_entry(inserted.reward_id, leg).await?;
        written.push(entry);
    }

    let posted = written.len() == legs.legs.len()
        && written.iter().all(|e| e.reward_id == inserted.reward_id);
    if !posted
        || !legs.is_balanced(&reward.stock_symbol, &reward.quantity, total_company_cost, currency)
    {
        return Err(SettlementError::PersistenceError(StorageError::Transaction(format!(
            "ledger legs for reward {} do not balance against {}",
            inserted.reward_id, total_company_cost
        ))));
    }

    Ok(inserted)
}
