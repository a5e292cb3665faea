//! Per-stream protocol loop.
//!
//! # Responsibilities
//! - Receive one event at a time from the proxy
//! - Dispatch by event kind and build exactly one decision
//! - Send the decision before receiving the next event
//! - Stop on peer close, cancellation or failure
//!
//! # Design Decisions
//! - Cancellation and a vanished peer are checked before every receive and while a decision is built
//! - Unknown event kinds get an empty reply, never an error
//! - A failed decision ends only this stream

use std::sync::Arc;

use envoy_types::pb::envoy::service::ext_proc::v3::{ProcessingRequest, ProcessingResponse};
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::{Code, Status};

use crate::aggregation::AggregationError;
use crate::backend::ResourceSource;
use crate::observability::metrics;
use crate::processing::builder::ResponseBuilder;
use crate::processing::event::{ProcessingDecision, ProcessingEvent};

/// Sender half feeding the gRPC response stream.
pub type ResponseSender = mpsc::Sender<Result<ProcessingResponse, Status>>;

/// How a stream ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The proxy half-closed the stream.
    ClosedByPeer,
    /// The stream was cancelled or its response side went away.
    ClosedByCancellation,
}

impl From<AggregationError> for Status {
    fn from(error: AggregationError) -> Self {
        Status::unavailable(format!("aggregation failed: {}", error))
    }
}

/// Drives one ext_proc stream.
pub struct StreamHandler<S> {
    builder: Arc<ResponseBuilder<S>>,
    cancel: CancellationToken,
}

impl<S: ResourceSource> StreamHandler<S> {
    pub fn new(builder: Arc<ResponseBuilder<S>>, cancel: CancellationToken) -> Self {
        Self { builder, cancel }
    }

    /// Run the receive → decide → send loop until the stream ends.
    ///
    /// An `Err` is the status the stream should be terminated with.
    pub async fn run<I>(self, inbound: I, outbound: ResponseSender) -> Result<StreamOutcome, Status>
    where
        I: Stream<Item = Result<ProcessingRequest, Status>>,
    {
        let mut inbound = std::pin::pin!(inbound);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Context done");
                    return Ok(StreamOutcome::ClosedByCancellation);
                }
                _ = outbound.closed() => {
                    tracing::debug!("Response stream closed");
                    return Ok(StreamOutcome::ClosedByCancellation);
                }
                next = inbound.next() => next,
            };

            let request = match next {
                // The proxy closed the stream; nothing more to send.
                None => return Ok(StreamOutcome::ClosedByPeer),
                Some(Ok(request)) => request,
                // tonic reports a peer reset as a cancelled receive.
                Some(Err(status)) if status.code() == Code::Cancelled => {
                    tracing::debug!("Stream reset by peer");
                    return Ok(StreamOutcome::ClosedByCancellation);
                }
                Some(Err(status)) => {
                    return Err(Status::unknown(format!(
                        "cannot receive stream request: {}",
                        status.message()
                    )));
                }
            };

            let event = ProcessingEvent::from(request);
            metrics::record_event(event.kind());

            let decision = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Context done while building decision");
                    return Ok(StreamOutcome::ClosedByCancellation);
                }
                _ = outbound.closed() => {
                    tracing::debug!("Response stream closed while building decision");
                    return Ok(StreamOutcome::ClosedByCancellation);
                }
                decision = self.dispatch(event) => decision?,
            };

            tracing::debug!(mutation = decision.is_mutation(), "Sending ProcessingResponse");
            if outbound.send(Ok(decision.into())).await.is_err() {
                tracing::debug!("Send failed, response stream closed");
                return Ok(StreamOutcome::ClosedByCancellation);
            }
        }
    }

    async fn dispatch(&self, event: ProcessingEvent) -> Result<ProcessingDecision, Status> {
        match event {
            ProcessingEvent::RequestHeaders(headers) => self.builder.build(&headers).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to build request headers response");
                Status::from(e)
            }),
            ProcessingEvent::Unset => {
                tracing::error!("Unknown request type");
                Ok(ProcessingDecision::Empty(None))
            }
            other => {
                tracing::debug!(kind = other.kind(), "Not handled, replying without changes");
                Ok(ProcessingDecision::Empty(other.phase()))
            }
        }
    }
}
