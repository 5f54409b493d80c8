use clap::{Parser, Subcommand};
use observability::LogFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rewardx")]
#[command(about = "StockRewards - stock reward settlement and portfolio valuation")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Log output format (pretty, json, compact)
    #[arg(long, global = true, env = "REWARDX_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the rewards service with the given configuration
    Start {
        /// Path to the configuration file
        #[arg(short, long, default_value = "master_config/rewards.yaml")]
        config: PathBuf,

        /// Override HTTP port
        #[arg(long)]
        http: Option<u16>,
    },

    /// Validate configuration without starting the service
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "master_config/rewards.yaml")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "rewards.yaml")]
        output: PathBuf,
    },

    /// Create the rewards and ledger tables in the configured database
    Migrate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "master_config/rewards.yaml")]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_defaults() {
        let cli = Cli::try_parse_from(["rewardx", "start"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Pretty);
        match cli.command {
            Commands::Start { config, http } => {
                assert_eq!(config, PathBuf::from("master_config/rewards.yaml"));
                assert!(http.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_log_format_and_override() {
        let cli = Cli::try_parse_from([
            "rewardx",
            "start",
            "--config",
            "prod.yaml",
            "--http",
            "9000",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Commands::Start { http: Some(9000), .. }));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["rewardx", "--log-format", "xml", "validate"]).is_err());
    }

    #[test]
    fn test_migrate() {
        let cli = Cli::try_parse_from(["rewardx", "migrate", "-c", "db.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Migrate { ref config } if config == &PathBuf::from("db.yaml")));
    }
}
