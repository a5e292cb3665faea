//! Envoy ext_proc service aggregation server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                EXT_PROC AGGREGATOR                    │
//!                      │                                                       │
//!   Envoy (gRPC bidi)  │  ┌────────┐   ┌────────────┐   ┌──────────────────┐  │
//!  ────────────────────┼─▶│  grpc  │──▶│ processing │──▶│   aggregation    │  │
//!                      │  │ server │   │   stream   │   │  albums ║ posts  │──┼──▶ Backend
//!  ◀───────────────────┼──│        │◀──│  builder   │◀──│   join + merge   │◀─┼─── (HTTP)
//!   ProcessingResponse │  └────────┘   └────────────┘   └──────────────────┘  │
//!                      │                                                       │
//!                      │  config · lifecycle · observability (logs, metrics)   │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use ext_proc_aggregator::cli::Cli;
use ext_proc_aggregator::lifecycle;
use ext_proc_aggregator::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("error setting up the logger: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!("ext-proc-aggregator v{} starting", env!("CARGO_PKG_VERSION"));

    match lifecycle::start(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
