//! PriceOracle trait definition

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

use crate::error::{OracleError, OracleResult};

/// A unit price for one symbol in the settlement currency
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: BigDecimal,
    pub quoted_at: DateTime<Utc>,
}

impl Quote {
    /// Build a quote, rejecting zero and negative prices
    pub fn new(symbol: impl Into<String>, price: BigDecimal) -> OracleResult<Self> {
        let symbol = symbol.into();
        if price <= BigDecimal::zero() {
            return Err(OracleError::InvalidPrice {
                symbol,
                price: price.to_string(),
            });
        }
        Ok(Self {
            symbol,
            price,
            quoted_at: Utc::now(),
        })
    }
}

/// Client trait for price lookups - protocol agnostic
///
/// Callers must not assume anything about freshness. A failed lookup is
/// always returned as an error and never replaced by a default price.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Fetch the current price of `symbol`
    async fn quote(&self, symbol: &str) -> OracleResult<Quote>;

    /// Provider name for logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_quote_rejects_non_positive() {
        assert_matches!(
            Quote::new("ACME", BigDecimal::zero()),
            Err(OracleError::InvalidPrice { .. })
        );
        assert_matches!(
            Quote::new("ACME", BigDecimal::from(-3)),
            Err(OracleError::InvalidPrice { .. })
        );
        assert!(Quote::new("ACME", BigDecimal::from(100)).is_ok());
    }
}
