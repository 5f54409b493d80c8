use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MasterConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    parse_config(&content)
}

/// Parse configuration text after environment substitution
pub fn parse_config(content: &str) -> Result<MasterConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    let config: MasterConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!(service = %config.service.name, "Configuration loaded successfully");
    Ok(config)
}

/// Development profile: in-memory ledger and a static price table
#[instrument]
pub fn generate_default_config() -> MasterConfig {
    use defaults::*;

    MasterConfig {
        service: ServiceConfig {
            name: "stock-rewards".to_string(),
            description: Some("Stock reward settlement and portfolio valuation".to_string()),
        },
        server: HttpServerConfig {
            host: default_host(),
            http_port: default_http_port(),
            metrics_port: Some(9090),
        },
        settlement: SettlementConfig::default(),
        valuation: ValuationConfig::default(),
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            postgres: Some(PostgresConfig {
                host: "${REWARDS_DB_HOST}".to_string(),
                port: default_postgres_port(),
                database: "stock_rewards".to_string(),
                user: "${REWARDS_DB_USER}".to_string(),
                password: "${REWARDS_DB_PASSWORD}".to_string(),
                ssl_mode: default_ssl_mode(),
                max_connections: default_max_connections(),
                connection_timeout_seconds: default_connection_timeout(),
            }),
        },
        oracle: OracleConfig {
            provider: OracleProvider::Static,
            static_prices: [
                ("RELIANCE", 2500.0),
                ("TCS", 3800.0),
                ("INFOSYS", 1500.0),
                ("HDFCBANK", 1650.0),
            ]
            .into_iter()
            .map(|(symbol, price)| (symbol.to_string(), price))
            .collect(),
            http: None,
        },
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &MasterConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_default_config() {
        let config = generate_default_config();

        assert_eq!(config.service.name, "stock-rewards");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.oracle.provider, OracleProvider::Static);
        assert_eq!(config.oracle.static_prices.len(), 4);
        assert!(validate_config(&config).is_valid());
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("rewardx-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rewards.yaml");

        let config = generate_default_config();
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded.service.name, config.service.name);
        assert_eq!(loaded.oracle.static_prices, config.oracle.static_prices);
        assert_eq!(loaded.valuation.day_boundary_offset, "+05:30");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config("/nonexistent/rewards.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_parse_config_substitutes_env() {
        std::env::set_var("REWARDX_PARSER_TEST_PORT", "9191");
        let yaml = r#"
service:
  name: "svc"
server:
  http_port: ${REWARDX_PARSER_TEST_PORT}
storage:
  type: memory
oracle:
  provider: static
"#;
        let cfg = parse_config(yaml).unwrap();
        assert_eq!(cfg.server.http_port, 9191);
    }
}
