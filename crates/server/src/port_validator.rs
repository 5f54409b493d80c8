//! Port checks before start-up
//!
//! A free port can still be taken between the check and the real bind; the
//! bind stays the source of truth. These checks only give early feedback.

use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Check that the HTTP and metrics ports can be bound
pub async fn validate_ports_available(config: &ServerConfig) -> Result<()> {
    let mut ports = vec![("HTTP", config.http_port)];
    if let Some(port) = config.metrics_port {
        if port == config.http_port {
            return Err(ServerError::ConfigError(format!(
                "HTTP and metrics share port {}",
                port
            )));
        }
        ports.push(("metrics", port));
    }

    for (purpose, port) in ports {
        validate_port_range(port)?;
        check_bindable(&config.host, port, purpose).await?;
    }
    Ok(())
}

async fn check_bindable(host: &str, port: u16, purpose: &str) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    debug!(purpose, port, "Checking port");

    match TcpListener::bind(&addr).await {
        Ok(listener) => {
            drop(listener);
            Ok(())
        }
        Err(e) => Err(ServerError::port_in_use(port, format!("{} port: {}", purpose, e))),
    }
}

/// Reject port 0 and warn about privileged ports
pub fn validate_port_range(port: u16) -> Result<()> {
    if port == 0 {
        return Err(ServerError::ConfigError("Port cannot be 0".to_string()));
    }
    if port < 1024 {
        warn!(port, "Privileged port, requires elevated permissions");
    }
    Ok(())
}

/// Check if a port is in use
pub async fn is_port_in_use(host: &str, port: u16) -> bool {
    TcpListener::bind(format!("{}:{}", host, port)).await.is_err()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_port_range() {
        assert!(validate_port_range(0).is_err());
        assert!(validate_port_range(80).is_ok());
        assert!(validate_port_range(8080).is_ok());
    }

    #[tokio::test]
    async fn test_taken_port_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(is_port_in_use("127.0.0.1", port).await);

        let config = ServerConfig::new("127.0.0.1", port);
        assert!(matches!(
            validate_ports_available(&config).await,
            Err(ServerError::PortInUse { .. })
        ));
    }

    #[tokio::test]
    async fn test_shared_port_rejected() {
        let config = ServerConfig::new("127.0.0.1", 18080).with_metrics_port(18080);
        assert!(matches!(
            validate_ports_available(&config).await,
            Err(ServerError::ConfigError(_))
        ));
    }
}
