use crate::*;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Service name is required")]
    MissingServiceName,

    #[error("Server: {message}")]
    InvalidServer { message: String },

    #[error("Invalid currency code: {0}. Must be three uppercase letters (e.g., INR)")]
    InvalidCurrency(String),

    #[error("fee_rate must be in [0, 1), got: {0}")]
    InvalidFeeRate(f64),

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("Invalid day_boundary_offset '{0}'. Expected +HH:MM or -HH:MM")]
    InvalidDayOffset(String),

    #[error("Storage: {message}")]
    InvalidStorage { message: String },

    #[error("Oracle: {message}")]
    InvalidOracle { message: String },

    #[error("Static price for '{symbol}' must be positive, got: {price}")]
    InvalidStaticPrice { symbol: String, price: f64 },

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &MasterConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    if config.service.name.trim().is_empty() {
        report.add_error(ValidationError::MissingServiceName);
    }

    validate_server(&config.server, &mut report);
    validate_settlement(&config.settlement, &mut report);
    validate_valuation(&config.valuation, &mut report);
    validate_storage(&config.storage, &mut report);
    validate_oracle(&config.oracle, &mut report);

    report
}

fn validate_server(server: &HttpServerConfig, report: &mut ValidationReport) {
    if server.http_port == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "server.http_port".to_string(),
        });
    }

    match server.metrics_port {
        Some(0) => report.add_error(ValidationError::InvalidPositiveInteger {
            field: "server.metrics_port".to_string(),
        }),
        Some(port) if port == server.http_port => {
            report.add_error(ValidationError::InvalidServer {
                message: format!("metrics_port and http_port are both {}", port),
            });
        }
        Some(_) => {}
        None => report.add_warning("server.metrics_port", "Not set, Prometheus exporter disabled"),
    }

    if server.host.trim().is_empty() {
        report.add_default("server.host", &defaults::default_host());
    }
}

fn validate_settlement(settlement: &SettlementConfig, report: &mut ValidationReport) {
    if !is_currency_code(&settlement.currency) {
        report.add_error(ValidationError::InvalidCurrency(settlement.currency.clone()));
    }

    if !settlement.fee_rate.is_finite() || settlement.fee_rate < 0.0 || settlement.fee_rate >= 1.0 {
        report.add_error(ValidationError::InvalidFeeRate(settlement.fee_rate));
    } else if settlement.fee_rate == 0.0 {
        report.add_warning("settlement.fee_rate", "Zero fee rate, FEE_EXPENSE legs will be 0");
    }

    if settlement.quote_timeout_ms == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "settlement.quote_timeout_ms".to_string(),
        });
    }
}

fn validate_valuation(valuation: &ValuationConfig, report: &mut ValidationReport) {
    if valuation.offset_seconds().is_none() {
        report.add_error(ValidationError::InvalidDayOffset(
            valuation.day_boundary_offset.clone(),
        ));
    }
}

fn validate_storage(storage: &StorageConfig, report: &mut ValidationReport) {
    match storage.backend {
        StorageBackend::Memory => {
            report.add_warning(
                "storage.type",
                "In-memory ledger selected, rewards are lost on restart",
            );
        }
        StorageBackend::Postgres => {
            let Some(pg) = &storage.postgres else {
                report.add_error(ValidationError::InvalidStorage {
                    message: "type is postgres but the postgres section is missing".to_string(),
                });
                return;
            };

            for (field, value) in [
                ("storage.postgres.host", &pg.host),
                ("storage.postgres.database", &pg.database),
                ("storage.postgres.user", &pg.user),
                ("storage.postgres.password", &pg.password),
            ] {
                check_resolved(field, value, report);
                if value.trim().is_empty() {
                    report.add_error(ValidationError::InvalidStorage {
                        message: format!("{} is required", field),
                    });
                }
            }

            if pg.port == 0 {
                report.add_error(ValidationError::InvalidPositiveInteger {
                    field: "storage.postgres.port".to_string(),
                });
            }
            if pg.max_connections == 0 {
                report.add_error(ValidationError::InvalidPositiveInteger {
                    field: "storage.postgres.max_connections".to_string(),
                });
            }
            if pg.connection_timeout_seconds == 0 {
                report.add_error(ValidationError::InvalidPositiveInteger {
                    field: "storage.postgres.connection_timeout_seconds".to_string(),
                });
            }

            let ssl_modes = ["disable", "allow", "prefer", "require", "verify-ca", "verify-full"];
            if !ssl_modes.contains(&pg.ssl_mode.as_str()) {
                report.add_error(ValidationError::InvalidStorage {
                    message: format!("unknown ssl_mode '{}'", pg.ssl_mode),
                });
            }
        }
    }
}

fn validate_oracle(oracle: &OracleConfig, report: &mut ValidationReport) {
    let mut symbols: Vec<_> = oracle.static_prices.iter().collect();
    symbols.sort_by(|a, b| a.0.cmp(b.0));
    for (symbol, price) in symbols {
        if !price.is_finite() || *price <= 0.0 {
            report.add_error(ValidationError::InvalidStaticPrice {
                symbol: symbol.clone(),
                price: *price,
            });
        }
    }

    match oracle.provider {
        OracleProvider::Static => {
            if oracle.static_prices.is_empty() {
                report.add_warning(
                    "oracle.static_prices",
                    "Static provider has no prices, every quote will fail",
                );
            }
        }
        OracleProvider::Http => {
            let Some(http) = &oracle.http else {
                report.add_error(ValidationError::InvalidOracle {
                    message: "provider is http but the http section is missing".to_string(),
                });
                return;
            };

            check_resolved("oracle.http.endpoint", &http.endpoint, report);
            if !has_unresolved_env_vars(&http.endpoint) {
                match Url::parse(&http.endpoint) {
                    Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                    Ok(url) => report.add_error(ValidationError::InvalidOracle {
                        message: format!("unsupported endpoint scheme '{}'", url.scheme()),
                    }),
                    Err(e) => report.add_error(ValidationError::InvalidOracle {
                        message: format!("invalid endpoint '{}': {}", http.endpoint, e),
                    }),
                }
            }

            if http.timeout_ms == 0 {
                report.add_error(ValidationError::InvalidPositiveInteger {
                    field: "oracle.http.timeout_ms".to_string(),
                });
            }
        }
    }
}

fn check_resolved(field: &str, value: &str, report: &mut ValidationReport) {
    for var in unresolved_env_vars(value) {
        report.add_error(ValidationError::InvalidEnvVar {
            var,
            message: format!("referenced by {} but not set", field),
        });
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}
