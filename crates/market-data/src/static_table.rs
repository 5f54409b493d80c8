//! Static price table oracle

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use std::collections::HashMap;

use crate::error::{OracleError, OracleResult};
use crate::oracle::{PriceOracle, Quote};

/// Oracle answering from a fixed price table
///
/// Used for development and the in-memory profile. Unknown symbols are
/// errors, never priced at zero.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceOracle {
    prices: HashMap<String, BigDecimal>,
}

impl StaticPriceOracle {
    /// Build from a symbol to price table
    pub fn new(prices: HashMap<String, BigDecimal>) -> OracleResult<Self> {
        if let Some((symbol, price)) = prices.iter().find(|(_, p)| **p <= BigDecimal::zero()) {
            return Err(OracleError::InvalidPrice {
                symbol: symbol.clone(),
                price: price.to_string(),
            });
        }
        Ok(Self { prices })
    }

    /// Symbols this oracle can price
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    async fn quote(&self, symbol: &str) -> OracleResult<Quote> {
        let price = self
            .prices
            .get(symbol)
            .ok_or_else(|| OracleError::UnknownSymbol(symbol.to_string()))?;
        Quote::new(symbol, price.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
