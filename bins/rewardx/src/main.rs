//! StockRewards CLI and Server Binary
//!
//! Entry point for the reward settlement service. It provides commands for
//! initializing, validating and migrating configuration and for starting
//! the HTTP API.

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use chrono::FixedOffset;
use cli::{Cli, Commands};
use config::{
    generate_default_config, load_config, save_config, validate_config, MasterConfig,
    OracleProvider, PostgresConfig, StorageBackend, ValidationReport,
};
use market_data::{HttpPriceOracle, PriceOracle, StaticPriceOracle};
use observability::init_logging;
use server::{health_routes, HealthState, HttpServer, ServerConfig, ServerExt};
use settlement::api::{create_api_state, create_router};
use settlement::{SettlementEngine, SettlementPolicy, ValuationAggregator, ValuationPolicy};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use storage::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging("rewardx", cli.log_format)?;
    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Commands::Start { config, http } => {
            info!("Executing 'start' command");
            start_service(config, http).await
        }
        Commands::Validate { config } => {
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Init { output } => {
            info!("Executing 'init' command");
            init_command(output).await
        }
        Commands::Migrate { config } => {
            info!("Executing 'migrate' command");
            migrate_command(config).await
        }
    }
}

/// Load the file and refuse to continue on validation errors
fn load_valid_config(config_path: &Path) -> Result<MasterConfig> {
    let config = load_config(config_path)?;
    let report = validate_config(&config);

    if !report.warnings.is_empty() {
        warn!("Configuration warnings:");
        for warning in &report.warnings {
            warn!(field = %warning.field, message = %warning.message);
        }
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start due to configuration errors");
    }

    Ok(config)
}

async fn start_service<P: AsRef<Path>>(config_path: P, http_override: Option<u16>) -> Result<()> {
    let config = load_valid_config(config_path.as_ref())?;
    let service_name = config.service.name.clone();

    let http_port = http_override.unwrap_or(config.server.http_port);
    if http_override.is_none() {
        debug!(port = http_port, "Using configured HTTP port");
    }

    let mut server_config = ServerConfig::new(config.server.host.clone(), http_port);
    if let Some(port) = config.server.metrics_port {
        server_config = server_config.with_metrics_port(port);
    }
    server::validate_ports_available(&server_config).await?;

    if let Some(port) = config.server.metrics_port {
        observability::init_metrics(port)?;
    }

    let store = build_store(&config).await?;
    let oracle = build_oracle(&config)?;
    let (settlement_policy, valuation_policy) = build_policies(&config)?;

    info!(
        service = %service_name,
        backend = store.backend(),
        oracle = oracle.name(),
        currency = %settlement_policy.currency,
        fee_rate = %settlement_policy.fee_rate,
        http_port,
        "Starting service"
    );

    let engine = SettlementEngine::new(store.clone(), oracle.clone(), settlement_policy);
    let valuation = ValuationAggregator::new(store, oracle, valuation_policy);

    let router = create_router(create_api_state(engine, valuation))
        .merge(health_routes(HealthState::new(service_name)));

    HttpServer::new(server_config, router).run_with_ctrl_c().await?;

    info!("Service stopped");
    Ok(())
}

async fn connect_postgres(pg: &PostgresConfig) -> Result<PostgresLedgerStore> {
    info!(host = %pg.host, database = %pg.database, "Connecting to PostgreSQL");
    let store = PostgresLedgerStore::connect(
        &pg.database_url(),
        pg.max_connections,
        Duration::from_secs(pg.connection_timeout_seconds),
    )
    .await
    .context("Failed to connect to the ledger database")?;
    Ok(store)
}

async fn build_store(config: &MasterConfig) -> Result<Arc<dyn LedgerStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory ledger; rewards are lost on restart");
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        StorageBackend::Postgres => {
            let pg = config
                .storage
                .postgres
                .as_ref()
                .context("storage.postgres section is required for the postgres backend")?;
            let store = connect_postgres(pg).await?;
            store
                .run_migrations()
                .await
                .context("Failed to run ledger migrations")?;
            Ok(Arc::new(store))
        }
    }
}

fn build_oracle(config: &MasterConfig) -> Result<Arc<dyn PriceOracle>> {
    match config.oracle.provider {
        OracleProvider::Static => {
            let prices = config
                .oracle
                .static_prices
                .iter()
                .map(|(symbol, price)| {
                    common::decimal::from_f64(*price)
                        .map(|p| (symbol.clone(), p))
                        .with_context(|| format!("Invalid static price for {}", symbol))
                })
                .collect::<Result<HashMap<String, BigDecimal>>>()?;
            info!(symbols = prices.len(), "Using static price table");
            Ok(Arc::new(StaticPriceOracle::new(prices)?))
        }
        OracleProvider::Http => {
            let http = config
                .oracle
                .http
                .as_ref()
                .context("oracle.http section is required for the http provider")?;
            info!(endpoint = %http.endpoint, "Using HTTP price oracle");
            let oracle =
                HttpPriceOracle::new(&http.endpoint, Duration::from_millis(http.timeout_ms))?;
            Ok(Arc::new(oracle))
        }
    }
}

fn build_policies(config: &MasterConfig) -> Result<(SettlementPolicy, ValuationPolicy)> {
    let fee_rate = common::decimal::from_f64(config.settlement.fee_rate)
        .context("Invalid settlement.fee_rate")?;
    let quote_timeout = Duration::from_millis(config.settlement.quote_timeout_ms);

    let day_offset = config
        .valuation
        .offset_seconds()
        .and_then(FixedOffset::east_opt)
        .with_context(|| {
            format!(
                "Invalid valuation.day_boundary_offset: {}",
                config.valuation.day_boundary_offset
            )
        })?;

    let settlement = SettlementPolicy {
        currency: config.settlement.currency.clone(),
        fee_rate,
        quote_timeout,
    };
    let valuation = ValuationPolicy {
        currency: config.settlement.currency.clone(),
        day_offset,
        quote_timeout,
    };
    Ok((settlement, valuation))
}

fn print_report(report: &ValidationReport) {
    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
    }
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);
    print_report(&report);

    if !report.is_valid() {
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Service: {}", config.service.name);
    println!("Storage: {:?}", config.storage.backend);
    println!("Oracle: {:?}", config.oracle.provider);
    println!(
        "Settlement: {} with fee rate {}",
        config.settlement.currency, config.settlement.fee_rate
    );
    println!("Day boundary: UTC{}", config.valuation.day_boundary_offset);

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("This configuration uses:");
    println!("  - In-memory ledger storage");
    println!(
        "  - Static price table ({} symbols)",
        config.oracle.static_prices.len()
    );
    println!("  - INR settlement with a 1% brokerage fee");
    println!();
    println!("Next steps:");
    println!("  1. Switch storage.type to postgres and set REWARDS_DB_* for a durable ledger");
    println!(
        "  2. Run 'rewardx validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'rewardx start --config {:?}' to start the service",
        output_path
    );

    Ok(())
}

async fn migrate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = load_valid_config(config_path.as_ref())?;

    if config.storage.backend != StorageBackend::Postgres {
        println!("Storage backend is {:?}; nothing to migrate", config.storage.backend);
        return Ok(());
    }

    let pg = config
        .storage
        .postgres
        .as_ref()
        .context("storage.postgres section is required for the postgres backend")?;
    let store = connect_postgres(pg).await?;
    store
        .run_migrations()
        .await
        .context("Failed to run ledger migrations")?;

    println!("[ok] Ledger tables are up to date");
    Ok(())
}
