//! Mock price oracle for testing

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{OracleError, OracleResult};
use crate::oracle::{PriceOracle, Quote};

/// Mock oracle with configurable prices, failures and latency
///
/// Every call is counted per symbol, including failed ones.
pub struct MockPriceOracle {
    prices: Mutex<HashMap<String, BigDecimal>>,
    failures: Mutex<HashMap<String, OracleError>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl MockPriceOracle {
    /// Create a mock that knows no symbols
    pub fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            delay: None,
        }
    }

    /// Answer `symbol` with `price`
    pub fn with_price(self, symbol: &str, price: BigDecimal) -> Self {
        self.set_price(symbol, price);
        self
    }

    /// Fail every quote for `symbol` with `error`
    pub fn with_failure(self, symbol: &str, error: OracleError) -> Self {
        self.failures.lock().insert(symbol.to_string(), error);
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change the price of `symbol`
    pub fn set_price(&self, symbol: &str, price: BigDecimal) {
        self.prices.lock().insert(symbol.to_string(), price);
    }

    /// Number of quotes requested for `symbol`
    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls.lock().get(symbol).copied().unwrap_or(0)
    }

    /// Number of quotes requested across all symbols
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

impl Default for MockPriceOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn quote(&self, symbol: &str) -> OracleResult<Quote> {
        *self.calls.lock().entry(symbol.to_string()).or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.lock().get(symbol) {
            return Err(error.clone());
        }

        let price = self.prices.lock().get(symbol).cloned();
        match price {
            Some(price) => Quote::new(symbol, price),
            None => Err(OracleError::UnknownSymbol(symbol.to_string())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let oracle = MockPriceOracle::new().with_price("ACME", BigDecimal::from(100));

        oracle.quote("ACME").await.unwrap();
        oracle.quote("ACME").await.unwrap();
        let _ = oracle.quote("ZETA").await;

        assert_eq!(oracle.calls_for("ACME"), 2);
        assert_eq!(oracle.calls_for("ZETA"), 1);
        assert_eq!(oracle.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure_wins_over_price() {
        let oracle = MockPriceOracle::new()
            .with_price("ACME", BigDecimal::from(100))
            .with_failure("ACME", OracleError::Provider("down".to_string()));

        assert_matches!(oracle.quote("ACME").await, Err(OracleError::Provider(_)));
    }

    #[tokio::test]
    async fn test_mock_rejects_zero_price() {
        let oracle = MockPriceOracle::new().with_price("ACME", BigDecimal::from(0));
        assert_matches!(oracle.quote("ACME").await, Err(OracleError::InvalidPrice { .. }));
    }
}
