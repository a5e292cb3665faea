//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{read_config, validate_config, ConfigError, ServiceConfig};

#[derive(Debug, Parser)]
#[command(name = "ext-proc-aggregator")]
#[command(version, about = "Envoy external processor that aggregates user albums and posts", long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// gRPC listen address (overrides listener.bind_address).
    #[arg(long, value_name = "ADDR")]
    pub grpc_addr: Option<String>,

    /// Log level (overrides observability.log_level).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Load the configuration file (or defaults), apply CLI overrides, then
    /// validate the result once.
    pub fn resolve_config(&self) -> Result<ServiceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(addr) = &self.grpc_addr {
            config.listener.bind_address = addr.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
