//! Ledger and domain types shared across StockRewards
//!
//! A settlement produces one [`Reward`] and exactly three [`LedgerEntry`]
//! legs: shares credited to the user, cash paid by the company, and the
//! brokerage fee. The legs carry different units (a stock symbol for the
//! share leg, the settlement currency for the other two), so "balanced"
//! here means the two currency legs add up to the company's total cost.

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// User identifier
pub type UserId = i64;

/// Reward identifier, assigned by the store
pub type RewardId = i64;

/// Ledger entry identifier, assigned by the store
pub type EntryId = i64;

/// Fractional digits kept for ledger amounts and share quantities
pub const AMOUNT_SCALE: i64 = 6;

/// Integer digits a share quantity may carry (`rewards.quantity NUMERIC(20,6)`)
pub const QUANTITY_INTEGER_DIGITS: u32 = 14;

/// Integer digits a ledger amount may carry (`ledger.amount NUMERIC(24,6)`)
pub const AMOUNT_INTEGER_DIGITS: u32 = 18;

/// True when `value` has at most `digits` digits before the decimal point
pub fn fits_integer_digits(value: &BigDecimal, digits: u32) -> bool {
    value.abs() < BigDecimal::from(10u64.pow(digits))
}

/// Description written on the share leg
pub const USER_ASSET_DESCRIPTION: &str = "Stock Reward";
/// Description written on the cash leg
pub const COMPANY_CASH_DESCRIPTION: &str = "Stock Purchase";
/// Description written on the fee leg
pub const FEE_EXPENSE_DESCRIPTION: &str = "Brokerage/Taxes";

/// Economic role of a ledger leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Shares held by the user
    UserAsset,
    /// Cash spent by the company buying the shares
    CompanyCash,
    /// Brokerage fees and taxes
    FeeExpense,
}

impl AccountType {
    /// All account categories, in posting order
    pub const ALL: [AccountType; 3] = [
        AccountType::UserAsset,
        AccountType::CompanyCash,
        AccountType::FeeExpense,
    ];

    /// Name as stored in the `account_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::UserAsset => "USER_ASSET",
            AccountType::CompanyCash => "COMPANY_CASH",
            AccountType::FeeExpense => "FEE_EXPENSE",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER_ASSET" => Ok(AccountType::UserAsset),
            "COMPANY_CASH" => Ok(AccountType::CompanyCash),
            "FEE_EXPENSE" => Ok(AccountType::FeeExpense),
            other => Err(Error::invalid_input(format!("unknown account type: {}", other))),
        }
    }
}

/// A committed settlement event
#[derive(Debug, Clone, PartialEq)]
pub struct Reward {
    pub reward_id: RewardId,
    pub user_id: UserId,
    pub stock_symbol: String,
    pub quantity: BigDecimal,
    pub rewarded_at: DateTime<Utc>,
}

/// A reward before the store has assigned its identifier
#[derive(Debug, Clone, PartialEq)]
pub struct NewReward {
    pub user_id: UserId,
    pub stock_symbol: String,
    pub quantity: BigDecimal,
    pub rewarded_at: DateTime<Utc>,
}

impl NewReward {
    /// Attach the identifier generated by the store
    pub fn with_id(self, reward_id: RewardId) -> Reward {
        Reward {
            reward_id,
            user_id: self.user_id,
            stock_symbol: self.stock_symbol,
            quantity: self.quantity,
            rewarded_at: self.rewarded_at,
        }
    }
}

/// One leg of a settlement, before it is written
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerLeg {
    pub account_type: AccountType,
    pub description: String,
    /// Signed amount in `unit`
    pub amount: BigDecimal,
    /// Stock symbol for share legs, currency code for cash legs
    pub unit: String,
}

impl LedgerLeg {
    /// Attach the owning reward and the identifier generated by the store
    pub fn into_entry(self, entry_id: EntryId, reward_id: RewardId) -> LedgerEntry {
        LedgerEntry {
            entry_id,
            reward_id,
            account_type: self.account_type,
            description: self.description,
            amount: self.amount,
            unit: self.unit,
        }
    }
}

/// A committed ledger leg
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub reward_id: RewardId,
    pub account_type: AccountType,
    pub description: String,
    pub amount: BigDecimal,
    pub unit: String,
}

/// Summed share quantity of one symbol for one user
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub stock_symbol: String,
    pub quantity: BigDecimal,
}

/// Half-open UTC interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Cost of buying `quantity` shares at one quoted price
#[derive(Debug, Clone, PartialEq)]
pub struct CostBreakdown {
    pub price: BigDecimal,
    pub stock_cost: BigDecimal,
    pub fee: BigDecimal,
    pub total_company_cost: BigDecimal,
}

impl CostBreakdown {
    /// `stock_cost = price * quantity`, `fee = stock_cost * fee_rate`
    ///
    /// Both parts are rounded to [`AMOUNT_SCALE`] before summing so the
    /// stored legs add up to exactly the reported total.
    pub fn compute(quantity: &BigDecimal, price: &BigDecimal, fee_rate: &BigDecimal) -> Self {
        let stock_cost = (price * quantity).round(AMOUNT_SCALE);
        let fee = (&stock_cost * fee_rate).round(AMOUNT_SCALE);
        let total_company_cost = &stock_cost + &fee;
        Self {
            price: price.clone(),
            stock_cost,
            fee,
            total_company_cost,
        }
    }
}

/// The three legs posted for one settlement
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementLegs {
    pub legs: [LedgerLeg; 3],
}

impl SettlementLegs {
    /// Build the share, cash and fee legs for a settlement
    pub fn post(symbol: &str, quantity: &BigDecimal, cost: &CostBreakdown, currency: &str) -> Self {
        Self {
            legs: [
                LedgerLeg {
                    account_type: AccountType::UserAsset,
                    description: USER_ASSET_DESCRIPTION.to_string(),
                    amount: quantity.clone(),
                    unit: symbol.to_string(),
                },
                LedgerLeg {
                    account_type: AccountType::CompanyCash,
                    description: COMPANY_CASH_DESCRIPTION.to_string(),
                    amount: -cost.stock_cost.clone(),
                    unit: currency.to_string(),
                },
                LedgerLeg {
                    account_type: AccountType::FeeExpense,
                    description: FEE_EXPENSE_DESCRIPTION.to_string(),
                    amount: -cost.fee.clone(),
                    unit: currency.to_string(),
                },
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedgerLeg> {
        self.legs.iter()
    }

    /// Sum of the absolute values of every leg denominated in `currency`
    pub fn currency_outflow(&self, currency: &str) -> BigDecimal {
        currency_outflow(self.legs.iter(), currency)
    }

    /// Check the per-settlement invariant against the reported cost.
    ///
    /// Exactly one leg per account category, the share leg carries the
    /// positive quantity in the symbol's unit, and the currency legs add up
    /// to `total_company_cost`.
    pub fn is_balanced(
        &self,
        symbol: &str,
        quantity: &BigDecimal,
        total_company_cost: &BigDecimal,
        currency: &str,
    ) -> bool {
        let one_per_account = AccountType::ALL
            .iter()
            .all(|a| self.legs.iter().filter(|l| l.account_type == *a).count() == 1);

        let share_leg_ok = self.legs.iter().any(|l| {
            l.account_type == AccountType::UserAsset
                && l.unit == symbol
                && l.amount == *quantity
                && l.amount > BigDecimal::zero()
        });

        let cash_legs_ok = self
            .legs
            .iter()
            .filter(|l| l.account_type != AccountType::UserAsset)
            .all(|l| l.unit == currency && l.amount <= BigDecimal::zero());

        one_per_account
            && share_leg_ok
            && cash_legs_ok
            && self.currency_outflow(currency) == *total_company_cost
    }
}

/// Sum of the absolute values of legs denominated in `currency`
pub fn currency_outflow<'a, I>(legs: I, currency: &str) -> BigDecimal
where
    I: IntoIterator<Item = &'a LedgerLeg>,
{
    legs.into_iter()
        .filter(|l| l.unit == currency)
        .fold(BigDecimal::zero(), |acc, l| acc + l.amount.abs())
}
