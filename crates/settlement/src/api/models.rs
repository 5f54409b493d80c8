//! API models for the rewards HTTP endpoints
//!
//! Quantities and money travel as JSON numbers. Conversion from decimals
//! fails rather than emitting `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use common::decimal::to_f64;
use common::error::Error;
use common::types::{AccountType, EntryId, Holding, LedgerEntry, Reward, RewardId, UserId};

/// Request to settle a reward
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRewardRequest {
    pub user_id: UserId,
    pub stock_symbol: String,
    pub quantity: f64,
}

/// Response after settling a reward
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRewardResponse {
    pub message: String,
    pub reward_id: RewardId,
    pub total_company_cost: f64,
    pub currency: String,
}

/// Reward in API response
#[derive(Debug, Serialize, Deserialize)]
pub struct RewardResponse {
    pub reward_id: RewardId,
    pub user_id: UserId,
    pub stock_symbol: String,
    pub quantity: f64,
    pub rewarded_at: DateTime<Utc>,
}

impl TryFrom<Reward> for RewardResponse {
    type Error = Error;

    fn try_from(reward: Reward) -> Result<Self, Self::Error> {
        Ok(Self {
            reward_id: reward.reward_id,
            user_id: reward.user_id,
            quantity: to_f64(&reward.quantity)?,
            stock_symbol: reward.stock_symbol,
            rewarded_at: reward.rewarded_at,
        })
    }
}

/// Ledger leg in API response
#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerEntryResponse {
    pub entry_id: EntryId,
    pub account_type: AccountType,
    pub description: String,
    pub amount: f64,
    pub unit: String,
}

impl TryFrom<LedgerEntry> for LedgerEntryResponse {
    type Error = Error;

    fn try_from(entry: LedgerEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            entry_id: entry.entry_id,
            account_type: entry.account_type,
            amount: to_f64(&entry.amount)?,
            description: entry.description,
            unit: entry.unit,
        })
    }
}

/// Reward with its ledger legs
#[derive(Debug, Serialize, Deserialize)]
pub struct RewardDetailResponse {
    pub reward: RewardResponse,
    pub ledger: Vec<LedgerEntryResponse>,
}

/// All-time holdings of a user
#[derive(Debug, Serialize, Deserialize)]
pub struct HoldingsResponse {
    pub user_id: UserId,
    pub holdings: BTreeMap<String, f64>,
}

/// One symbol rewarded today
#[derive(Debug, Serialize, Deserialize)]
pub struct TodayHoldingResponse {
    pub stock_symbol: String,
    pub total_quantity: f64,
}

impl TryFrom<Holding> for TodayHoldingResponse {
    type Error = Error;

    fn try_from(holding: Holding) -> Result<Self, Self::Error> {
        Ok(Self {
            total_quantity: to_f64(&holding.quantity)?,
            stock_symbol: holding.stock_symbol,
        })
    }
}

/// Holdings valued at current quotes
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_shares_by_stock: BTreeMap<String, f64>,
    pub current_portfolio_value: f64,
    pub currency: String,
}

/// Error detail
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Generic error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
