//! Server configuration

use crate::error::{Result, ServerError};
use std::net::SocketAddr;

/// Default port assignments
pub mod ports {
    /// Rewards HTTP API
    pub const DEFAULT_HTTP: u16 = 8080;
    /// Prometheus exporter
    pub const DEFAULT_METRICS: u16 = 9090;
}

/// Where the HTTP API and the metrics exporter listen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// HTTP API port, `0` for an ephemeral port
    pub http_port: u16,
    /// Prometheus exporter port, disabled when `None`
    pub metrics_port: Option<u16>,
}

impl ServerConfig {
    /// HTTP API only
    pub fn new(host: impl Into<String>, http_port: u16) -> Self {
        Self {
            host: host.into(),
            http_port,
            metrics_port: None,
        }
    }

    /// Also expose Prometheus metrics on `port`
    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    /// Get HTTP socket address
    pub fn http_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.http_port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, self.http_port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: ports::DEFAULT_HTTP,
            metrics_port: Some(ports::DEFAULT_METRICS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_new() {
        let config = ServerConfig::new("127.0.0.1", 8080).with_metrics_port(9191);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.metrics_port, Some(9191));
        assert_eq!(config.http_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_default_ports() {
        let config = ServerConfig::default();
        assert_eq!(config.http_port, ports::DEFAULT_HTTP);
        assert_eq!(config.metrics_port, Some(ports::DEFAULT_METRICS));
    }

    #[test]
    fn test_invalid_host() {
        let config = ServerConfig::new("not a host", 8080);
        assert!(matches!(config.http_addr(), Err(ServerError::InvalidAddress(_))));
    }
}
