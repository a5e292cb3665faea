//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize metrics (if enabled)
//! - Build the backend client and gRPC server
//! - Bind the listener last, then serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned to `main`
//! - Subsystems initialize in order, not concurrently

use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::grpc::{GrpcServer, ServerError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_listener;
use crate::observability::metrics;

/// Start every subsystem and serve until SIGINT/SIGTERM.
pub async fn start(config: ServiceConfig) -> Result<(), ServerError> {
    tracing::info!(
        release = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        backend = %config.backend.base_url,
        identifier_header = %config.aggregation.identifier_header,
        failure_policy = ?config.aggregation.failure_policy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = GrpcServer::from_config(config)?;

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signals = spawn_signal_listener(shutdown);

    let result = server.run(listener, server_shutdown).await;
    signals.abort();
    result
}
