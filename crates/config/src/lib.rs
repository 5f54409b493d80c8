use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Root of `rewards.yaml`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MasterConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub valuation: ValuationConfig,
    pub storage: StorageConfig,
    pub oracle: OracleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(rename = "http_port")]
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Prometheus exporter port; metrics are off when absent
    #[serde(rename = "metrics_port")]
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            metrics_port: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettlementConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Brokerage fee as a fraction of the stock cost (0.01 = 1%)
    #[serde(rename = "fee_rate")]
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,
    #[serde(rename = "quote_timeout_ms")]
    #[serde(default = "default_quote_timeout_ms")]
    pub quote_timeout_ms: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            fee_rate: default_fee_rate(),
            quote_timeout_ms: default_quote_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValuationConfig {
    /// UTC offset whose local midnight starts "today", e.g. "+05:30"
    #[serde(rename = "day_boundary_offset")]
    #[serde(default = "default_day_boundary_offset")]
    pub day_boundary_offset: String,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            day_boundary_offset: default_day_boundary_offset(),
        }
    }
}

impl ValuationConfig {
    /// Offset in seconds east of UTC, `None` when malformed
    pub fn offset_seconds(&self) -> Option<i32> {
        parse_utc_offset(&self.day_boundary_offset)
    }
}

/// Parse `+HH:MM` / `-HH:MM` into seconds east of UTC
pub fn parse_utc_offset(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Some(0);
    }
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub backend: StorageBackend,
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostgresConfig {
    pub host: String,
    #[serde(default = "default_postgres_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    #[serde(rename = "ssl_mode")]
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
    #[serde(rename = "max_connections")]
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(rename = "connection_timeout_seconds")]
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

impl PostgresConfig {
    /// Connection string for sqlx
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleProvider {
    Static,
    Http,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleConfig {
    pub provider: OracleProvider,
    /// Price table used by the static provider, keyed by stock symbol
    #[serde(rename = "static_prices")]
    #[serde(default)]
    pub static_prices: HashMap<String, f64>,
    #[serde(default)]
    pub http: Option<HttpOracleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpOracleConfig {
    pub endpoint: String,
    #[serde(rename = "timeout_ms")]
    #[serde(default = "default_oracle_http_timeout_ms")]
    pub timeout_ms: u64,
}
