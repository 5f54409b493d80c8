//! Valuation Aggregator - read-only views over committed rewards

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use common::types::{Holding, TimeWindow, UserId};
use market_data::PriceOracle;
use storage::LedgerStore;

use crate::error::{Result, SettlementError};
use crate::metrics::record_valuation_quotes;
use crate::policy::ValuationPolicy;
use crate::quotes::fetch_quote;

/// Holdings of one user valued at fresh quotes
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioStats {
    /// Summed quantity per symbol
    pub holdings: BTreeMap<String, BigDecimal>,
    /// Sum of quantity times quote over every symbol
    pub total_value: BigDecimal,
    pub currency: String,
}

/// The local calendar day containing `now`, as a half-open UTC interval
pub fn today_window(now: DateTime<Utc>, offset: FixedOffset) -> TimeWindow {
    let local_midnight = now.with_timezone(&offset).date_naive().and_time(NaiveTime::MIN);
    let start = Utc.from_utc_datetime(
        &(local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))),
    );
    TimeWindow::new(start, start + Duration::days(1))
}

/// Valuation Aggregator - sums holdings and revalues them
///
/// Never writes to the store.
pub struct ValuationAggregator {
    store: Arc<dyn LedgerStore>,
    oracle: Arc<dyn PriceOracle>,
    policy: ValuationPolicy,
}

impl ValuationAggregator {
    /// Create a new ValuationAggregator
    pub fn new(
        store: Arc<dyn LedgerStore>,
        oracle: Arc<dyn PriceOracle>,
        policy: ValuationPolicy,
    ) -> Self {
        Self {
            store,
            oracle,
            policy,
        }
    }

    /// The policy this aggregator uses
    pub fn policy(&self) -> &ValuationPolicy {
        &self.policy
    }

    /// Summed quantity per symbol over all committed rewards
    pub async fn holdings(&self, user_id: UserId) -> Result<BTreeMap<String, BigDecimal>> {
        let holdings = self.load(user_id, None).await?;
        Ok(holdings
            .into_iter()
            .map(|h| (h.stock_symbol, h.quantity))
            .collect())
    }

    /// Summed quantity per symbol over rewards settled today
    pub async fn today_holdings(&self, user_id: UserId) -> Result<Vec<Holding>> {
        self.today_holdings_at(user_id, Utc::now()).await
    }

    /// Same as [`today_holdings`](Self::today_holdings) with an explicit clock
    pub async fn today_holdings_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Vec<Holding>> {
        let window = today_window(now, self.policy.day_offset);
        debug!(user_id, start = %window.start, end = %window.end, "Today window");
        self.load(user_id, Some(window)).await
    }

    /// Holdings valued at one fresh quote per symbol
    ///
    /// If any symbol cannot be quoted the whole call fails.
    #[instrument(skip(self))]
    pub async fn stats(&self, user_id: UserId) -> Result<PortfolioStats> {
        let holdings = self.load(user_id, None).await?;

        let quotes = try_join_all(holdings.iter().map(|h| {
            fetch_quote(self.oracle.as_ref(), &h.stock_symbol, self.policy.quote_timeout)
        }))
        .await?;
        record_valuation_quotes(quotes.len());

        let total_value = holdings
            .iter()
            .zip(quotes.iter())
            .fold(BigDecimal::zero(), |acc, (h, q)| acc + &h.quantity * &q.price);

        Ok(PortfolioStats {
            holdings: holdings
                .into_iter()
                .map(|h| (h.stock_symbol, h.quantity))
                .collect(),
            total_value,
            currency: self.policy.currency.clone(),
        })
    }

    /// Committed holdings ordered by symbol, zero sums omitted
    async fn load(&self, user_id: UserId, window: Option<TimeWindow>) -> Result<Vec<Holding>> {
        if user_id <= 0 {
            return Err(SettlementError::invalid("user_id must be positive"));
        }

        let mut holdings = self.store.holdings(user_id, window).await?;
        holdings.retain(|h| !h.quantity.is_zero());
        holdings.sort_by(|a, b| a.stock_symbol.cmp(&b.stock_symbol));
        Ok(holdings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SettlementEngine;
    use crate::policy::SettlementPolicy;
    use assert_matches::assert_matches;
    use common::types::NewReward;
    use market_data::{MockPriceOracle, OracleError};
    use std::str::FromStr;
    use storage::InMemoryLedgerStore;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    struct Fixture {
        store: Arc<InMemoryLedgerStore>,
        oracle: Arc<MockPriceOracle>,
        engine: SettlementEngine,
        valuation: ValuationAggregator,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryLedgerStore::new());
        let oracle = Arc::new(
            MockPriceOracle::new()
                .with_price("ACME", dec("100.0"))
                .with_price("BOLT", dec("50")),
        );
        Fixture {
            engine: SettlementEngine::new(store.clone(), oracle.clone(), SettlementPolicy::default()),
            valuation: ValuationAggregator::new(store.clone(), oracle.clone(), ValuationPolicy::default()),
            store,
            oracle,
        }
    }

    async fn insert_raw(store: &InMemoryLedgerStore, user_id: UserId, symbol: &str, qty: &str, when: DateTime<Utc>) {
        let mut tx = store.begin().await.unwrap();
        tx.insert_reward(&NewReward {
            user_id,
            stock_symbol: symbol.to_string(),
            quantity: dec(qty),
            rewarded_at: when,
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    #[test]
    fn test_today_window_uses_offset() {
        let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();

        // 01:30 local on the 11th
        let window = today_window(at("2026-03-10T20:00:00Z"), offset);
        assert_eq!(window.start, at("2026-03-10T18:30:00Z"));
        assert_eq!(window.end, at("2026-03-11T18:30:00Z"));

        // 23:59 local on the 10th
        let window = today_window(at("2026-03-10T18:29:00Z"), offset);
        assert_eq!(window.start, at("2026-03-09T18:30:00Z"));
    }

    #[test]
    fn test_today_window_negative_offset() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let window = today_window(at("2026-03-10T03:00:00Z"), offset);
        assert_eq!(window.start, at("2026-03-09T05:00:00Z"));
        assert_eq!(window.end, at("2026-03-10T05:00:00Z"));
    }

    #[tokio::test]
    async fn test_holdings_sum_settlements() {
        let f = fixture();
        f.engine.settle(1, "ACME", dec("4")).await.unwrap();
        f.engine.settle(1, "ACME", dec("6.5")).await.unwrap();
        f.engine.settle(1, "BOLT", dec("1")).await.unwrap();

        let holdings = f.valuation.holdings(1).await.unwrap();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings["ACME"], dec("10.5"));
        assert_eq!(holdings["BOLT"], dec("1"));
    }

    #[tokio::test]
    async fn test_holdings_do_not_quote() {
        let f = fixture();
        f.engine.settle(1, "ACME", dec("4")).await.unwrap();
        let before = f.oracle.total_calls();

        f.valuation.holdings(1).await.unwrap();
        assert_eq!(f.oracle.total_calls(), before);
    }

    #[tokio::test]
    async fn test_zero_sum_symbols_omitted() {
        let f = fixture();
        let now = Utc::now();
        insert_raw(&f.store, 1, "ACME", "5", now).await;
        insert_raw(&f.store, 1, "ACME", "-5", now).await;
        insert_raw(&f.store, 1, "BOLT", "2", now).await;

        let holdings = f.valuation.holdings(1).await.unwrap();
        assert_eq!(holdings.keys().collect::<Vec<_>>(), vec!["BOLT"]);

        let stats = f.valuation.stats(1).await.unwrap();
        assert_eq!(stats.total_value, dec("100"));
        assert_eq!(f.oracle.calls_for("ACME"), 0);
    }

    #[tokio::test]
    async fn test_stats_uses_fresh_quote() {
        let f = fixture();
        f.engine.settle(1, "ACME", dec("10")).await.unwrap();
        f.oracle.set_price("ACME", dec("120.0"));

        let stats = f.valuation.stats(1).await.unwrap();
        assert_eq!(stats.total_value, dec("1200.0"));
        assert_eq!(stats.holdings["ACME"], dec("10"));
        assert_eq!(stats.currency, "INR");
    }

    #[tokio::test]
    async fn test_stats_quotes_each_symbol_once() {
        let f = fixture();
        for _ in 0..3 {
            f.engine.settle(1, "ACME", dec("1")).await.unwrap();
            f.engine.settle(1, "BOLT", dec("2")).await.unwrap();
        }
        let acme_before = f.oracle.calls_for("ACME");
        let bolt_before = f.oracle.calls_for("BOLT");

        let stats = f.valuation.stats(1).await.unwrap();
        assert_eq!(f.oracle.calls_for("ACME") - acme_before, 1);
        assert_eq!(f.oracle.calls_for("BOLT") - bolt_before, 1);
        assert_eq!(stats.total_value, dec("600.0"));
    }

    #[tokio::test]
    async fn test_stats_fails_whole_request() {
        let store = Arc::new(InMemoryLedgerStore::new());
        insert_raw(&store, 1, "ACME", "1", Utc::now()).await;
        insert_raw(&store, 1, "BOLT", "1", Utc::now()).await;
        let oracle = Arc::new(
            MockPriceOracle::new()
                .with_price("ACME", dec("100"))
                .with_failure("BOLT", OracleError::Provider("halted".to_string())),
        );
        let valuation = ValuationAggregator::new(store, oracle, ValuationPolicy::default());

        assert_matches!(
            valuation.stats(1).await,
            Err(SettlementError::QuoteUnavailable { symbol, .. }) if symbol == "BOLT"
        );
    }

    #[tokio::test]
    async fn test_stats_empty_user() {
        let f = fixture();
        let stats = f.valuation.stats(42).await.unwrap();
        assert!(stats.holdings.is_empty());
        assert!(stats.total_value.is_zero());
        assert_eq!(f.oracle.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_user_id() {
        let f = fixture();
        assert_matches!(f.valuation.holdings(0).await, Err(SettlementError::InvalidRequest(_)));
        assert_matches!(f.valuation.stats(-3).await, Err(SettlementError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_today_holdings_at_boundary() {
        let f = fixture();
        insert_raw(&f.store, 1, "ACME", "3", at("2026-03-10T18:29:59Z")).await;
        insert_raw(&f.store, 1, "ACME", "4", at("2026-03-10T18:30:00Z")).await;
        insert_raw(&f.store, 1, "BOLT", "1", at("2026-03-11T18:29:59Z")).await;
        insert_raw(&f.store, 1, "BOLT", "9", at("2026-03-11T18:30:00Z")).await;

        let today = f
            .valuation
            .today_holdings_at(1, at("2026-03-10T20:00:00Z"))
            .await
            .unwrap();

        assert_eq!(
            today,
            vec![
                Holding { stock_symbol: "ACME".to_string(), quantity: dec("4") },
                Holding { stock_symbol: "BOLT".to_string(), quantity: dec("1") },
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_users_do_not_mix() {
        let f = fixture();
        let engine = Arc::new(f.engine);

        let mut handles = Vec::new();
        for i in 0..20 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                let (user, symbol) = if i % 2 == 0 { (1, "ACME") } else { (2, "BOLT") };
                engine.settle(user, symbol, BigDecimal::from(1)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let first = f.valuation.holdings(1).await.unwrap();
        let second = f.valuation.holdings(2).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first["ACME"], BigDecimal::from(10));
        assert_eq!(second.len(), 1);
        assert_eq!(second["BOLT"], BigDecimal::from(10));
        assert_eq!(f.store.reward_count(), 20);
        assert_eq!(f.store.entry_count(), 60);
    }
}
