//! Settlement metrics
//!
//! Names are shared with `observability::metrics`, which registers their
//! descriptions at start-up.

use metrics::{counter, histogram, Counter, Histogram};
use observability::metrics::names;
use std::time::Duration;

/// Counters and latency for the settlement path
#[derive(Clone)]
pub struct SettlementMetrics {
    settled: Counter,
    duration: Histogram,
}

impl SettlementMetrics {
    /// Create the settlement metric handles
    pub fn new() -> Self {
        Self {
            settled: counter!(names::REWARDS_SETTLED_TOTAL),
            duration: histogram!(names::SETTLEMENT_DURATION_SECONDS),
        }
    }

    /// Record a committed settlement
    pub fn record_settled(&self, elapsed: Duration) {
        self.settled.increment(1);
        self.duration.record(elapsed.as_secs_f64());
    }

    /// Record a failed settlement
    pub fn record_failure(&self, reason: &'static str) {
        counter!(names::SETTLEMENT_FAILURES_TOTAL, "reason" => reason).increment(1);
    }
}

impl Default for SettlementMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Record the quote requests made by one valuation pass
pub fn record_valuation_quotes(count: usize) {
    counter!(names::VALUATION_QUOTES_TOTAL).increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed: every call is a no-op
        let metrics = SettlementMetrics::new();
        metrics.record_settled(Duration::from_millis(3));
        metrics.record_failure("quote_unavailable");
        record_valuation_quotes(2);
    }
}
