//! Bounded, validated oracle lookups

use bigdecimal::{BigDecimal, Zero};
use market_data::{PriceOracle, Quote};
use std::time::Duration;
use tracing::warn;

use crate::error::{Result, SettlementError};

/// Fetch one quote, bounded by `timeout`
///
/// The oracle is untrusted, so the price is checked again here. Any failure
/// becomes [`SettlementError::QuoteUnavailable`].
pub async fn fetch_quote(oracle: &dyn PriceOracle, symbol: &str, timeout: Duration) -> Result<Quote> {
    let unavailable = |reason: String| {
        warn!(oracle = oracle.name(), symbol, %reason, "Quote unavailable");
        SettlementError::QuoteUnavailable {
            symbol: symbol.to_string(),
            reason,
        }
    };

    let quote = match tokio::time::timeout(timeout, oracle.quote(symbol)).await {
        Ok(Ok(quote)) => quote,
        Ok(Err(e)) => return Err(unavailable(e.to_string())),
        Err(_) => return Err(unavailable(format!("no answer within {}ms", timeout.as_millis()))),
    };

    if quote.price <= BigDecimal::zero() {
        return Err(unavailable(format!("non-positive price {}", quote.price)));
    }
    if quote.symbol != symbol {
        return Err(unavailable(format!("quote is for {}", quote.symbol)));
    }

    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use market_data::{MockPriceOracle, OracleError};

    #[tokio::test]
    async fn test_fetch_quote_ok() {
        let oracle = MockPriceOracle::new().with_price("ACME", BigDecimal::from(100));
        let quote = fetch_quote(&oracle, "ACME", Duration::from_secs(1)).await.unwrap();
        assert_eq!(quote.price, BigDecimal::from(100));
    }

    #[tokio::test]
    async fn test_fetch_quote_maps_oracle_error() {
        let oracle = MockPriceOracle::new()
            .with_failure("ACME", OracleError::Transport("connection refused".to_string()));
        assert_matches!(
            fetch_quote(&oracle, "ACME", Duration::from_secs(1)).await,
            Err(SettlementError::QuoteUnavailable { symbol, .. }) if symbol == "ACME"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_quote_times_out() {
        let oracle = MockPriceOracle::new()
            .with_price("ACME", BigDecimal::from(100))
            .with_delay(Duration::from_secs(10));
        assert_matches!(
            fetch_quote(&oracle, "ACME", Duration::from_millis(50)).await,
            Err(SettlementError::QuoteUnavailable { .. })
        );
    }
}
