//! Prometheus metrics
//!
//! [`init_metrics`] installs the exporter. The metric names recorded by the
//! service crates live in [`names`] so descriptions and call sites agree.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Metric names
pub mod names {
    /// Settlements committed
    pub const REWARDS_SETTLED_TOTAL: &str = "rewards_settled_total";
    /// Settlements that failed, labelled by `reason`
    pub const SETTLEMENT_FAILURES_TOTAL: &str = "settlement_failures_total";
    /// Wall time of one settlement
    pub const SETTLEMENT_DURATION_SECONDS: &str = "settlement_duration_seconds";
    /// Quotes requested while valuing portfolios
    pub const VALUATION_QUOTES_TOTAL: &str = "valuation_quotes_total";
}

/// Start the Prometheus exporter on all interfaces
///
/// Metrics are served at `/metrics` on `port`.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Register descriptions for every metric the services record
pub fn describe_metrics() {
    describe_counter!(names::REWARDS_SETTLED_TOTAL, "Rewards settled and committed");
    describe_counter!(
        names::SETTLEMENT_FAILURES_TOTAL,
        "Settlements rejected or rolled back, by reason"
    );
    describe_histogram!(
        names::SETTLEMENT_DURATION_SECONDS,
        Unit::Seconds,
        "Time from request to commit"
    );
    describe_counter!(names::VALUATION_QUOTES_TOTAL, "Quotes fetched for portfolio valuation");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: descriptions are dropped silently
        describe_metrics();
    }

    #[test]
    fn test_metric_names_are_prometheus_safe() {
        for name in [
            names::REWARDS_SETTLED_TOTAL,
            names::SETTLEMENT_FAILURES_TOTAL,
            names::SETTLEMENT_DURATION_SECONDS,
            names::VALUATION_QUOTES_TOTAL,
        ] {
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{}", name);
        }
    }
}
