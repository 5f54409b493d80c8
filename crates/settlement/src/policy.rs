//! Settlement and valuation policies

use bigdecimal::BigDecimal;
use chrono::{FixedOffset, Offset, Utc};
use std::time::Duration;

/// Default settlement currency
pub const DEFAULT_CURRENCY: &str = "INR";

/// Default brokerage fee rate, in hundredths
pub const DEFAULT_FEE_RATE_PERCENT: i64 = 1;

/// Default "today" boundary, +05:30
pub const DEFAULT_DAY_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

/// Default bound on one oracle call
pub const DEFAULT_QUOTE_TIMEOUT: Duration = Duration::from_secs(2);

/// Fixed parameters of every settlement
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementPolicy {
    /// Currency code written on the cash and fee legs
    pub currency: String,
    /// Fee as a fraction of the stock cost
    pub fee_rate: BigDecimal,
    /// Bound on the oracle call
    pub quote_timeout: Duration,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            fee_rate: BigDecimal::from(DEFAULT_FEE_RATE_PERCENT) / BigDecimal::from(100),
            quote_timeout: DEFAULT_QUOTE_TIMEOUT,
        }
    }
}

/// Parameters of the valuation aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationPolicy {
    /// Currency the portfolio value is reported in
    pub currency: String,
    /// Offset whose local midnight starts "today"
    pub day_offset: FixedOffset,
    /// Bound on each oracle call
    pub quote_timeout: Duration,
}

impl Default for ValuationPolicy {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            day_offset: FixedOffset::east_opt(DEFAULT_DAY_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix()),
            quote_timeout: DEFAULT_QUOTE_TIMEOUT,
        }
    }
}
