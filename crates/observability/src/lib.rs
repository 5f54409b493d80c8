//! Observability for StockRewards
//!
//! - Structured logging via tracing
//! - Prometheus metrics exporter and the descriptions of every metric
//!   the services record
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("stock-rewards", LogFormat::Json)?;
//! observability::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{describe_metrics, init_metrics};
