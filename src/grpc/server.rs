//! gRPC server setup.
//!
//! # Responsibilities
//! - Implement `envoy.service.ext_proc.v3.ExternalProcessor`
//! - Spawn one task per ext_proc stream
//! - Register the health service
//! - Serve until shutdown, then drain for the grace period
//!
//! # Design Decisions
//! - Streams are independent tasks; one failing never touches another
//! - Shutdown stops accepting first, then cancels streams still open after the grace period

use std::sync::Arc;
use std::time::Duration;

use envoy_types::pb::envoy::service::ext_proc::v3::external_processor_server::{
    ExternalProcessor, ExternalProcessorServer,
};
use envoy_types::pb::envoy::service::ext_proc::v3::{ProcessingRequest, ProcessingResponse};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::{Request, Response, Status, Streaming};
use tonic_health::pb::health_server::HealthServer;
use tracing::Instrument;
use uuid::Uuid;

use crate::aggregation::Aggregator;
use crate::backend::{FetchError, HttpResourceSource, ResourceSource};
use crate::config::ServiceConfig;
use crate::grpc::health::HealthService;
use crate::observability::metrics;
use crate::processing::{ResponseBuilder, StreamHandler, StreamOutcome};

/// Error type for server startup and serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("backend client error: {0}")]
    Backend(#[from] FetchError),
}

/// `ExternalProcessor` implementation.
pub struct ExtProcService<S> {
    builder: Arc<ResponseBuilder<S>>,
    streams: CancellationToken,
}

impl<S: ResourceSource> ExtProcService<S> {
    /// `streams` is the parent of every per-stream cancellation token.
    pub fn new(builder: Arc<ResponseBuilder<S>>, streams: CancellationToken) -> Self {
        Self { builder, streams }
    }
}

#[tonic::async_trait]
impl<S: ResourceSource> ExternalProcessor for ExtProcService<S> {
    type ProcessStream = ReceiverStream<Result<ProcessingResponse, Status>>;

    async fn process(
        &self,
        request: Request<Streaming<ProcessingRequest>>,
    ) -> Result<Response<Self::ProcessStream>, Status> {
        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(1);
        let handler = StreamHandler::new(self.builder.clone(), self.streams.child_token());
        let span = tracing::info_span!("stream", stream_id = %Uuid::new_v4());

        tokio::spawn(
            async move {
                metrics::record_stream_opened();
                tracing::debug!("Stream opened");

                match handler.run(inbound, tx.clone()).await {
                    Ok(StreamOutcome::ClosedByPeer) => tracing::debug!("Stream closed by peer"),
                    Ok(StreamOutcome::ClosedByCancellation) => tracing::debug!("Stream cancelled"),
                    Err(status) => {
                        tracing::warn!(code = ?status.code(), message = %status.message(), "Stream failed");
                        let _ = tx.send(Err(status)).await;
                    }
                }

                metrics::record_stream_closed();
            }
            .instrument(span),
        );

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// gRPC server for the external processing service.
pub struct GrpcServer<S> {
    config: ServiceConfig,
    builder: Arc<ResponseBuilder<S>>,
    streams: CancellationToken,
}

impl GrpcServer<HttpResourceSource> {
    /// Create a server that fetches from the configured HTTP backend.
    pub fn from_config(config: ServiceConfig) -> Result<Self, ServerError> {
        let source = HttpResourceSource::new(&config.backend)?;
        Ok(Self::new(config, source))
    }
}

impl<S: ResourceSource> GrpcServer<S> {
    pub fn new(config: ServiceConfig, source: S) -> Self {
        let builder = ResponseBuilder::new(Aggregator::new(source), &config.aggregation);
        Self {
            config,
            builder: Arc::new(builder),
            streams: CancellationToken::new(),
        }
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// After the signal no new connections are accepted; open streams get
    /// `shutdown.grace_period_secs` to finish before they are cancelled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let grace = Duration::from_secs(self.config.shutdown.grace_period_secs);
        tracing::info!(
            address = %addr,
            max_concurrent_streams = self.config.listener.max_concurrent_streams,
            "Starting gRPC server"
        );

        let stopping = CancellationToken::new();
        let signal = {
            let stopping = stopping.clone();
            async move {
                let _ = shutdown.recv().await;
                tracing::info!("Gracefully stopping gRPC server");
                stopping.cancel();
            }
        };

        let ext_proc = ExtProcService::new(self.builder.clone(), self.streams.clone());
        let serve = Server::builder()
            .max_concurrent_streams(self.config.listener.max_concurrent_streams)
            .trace_fn(|req| tracing::info_span!("grpc", path = %req.uri().path()))
            .add_service(ExternalProcessorServer::new(ext_proc))
            .add_service(HealthServer::new(HealthService))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal);
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => {
                result?;
                tracing::info!("gRPC server stopped");
                return Ok(());
            }
            _ = stopping.cancelled() => {}
        }

        match tokio::time::timeout(grace, &mut serve).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    grace_period_secs = grace.as_secs(),
                    "Grace period elapsed, cancelling open streams"
                );
                self.streams.cancel();
            }
        }

        tracing::info!("gRPC server stopped");
        Ok(())
    }
}
