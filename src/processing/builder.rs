//! Decision building for request-headers events.

use tracing::Instrument;

use crate::aggregation::{AggregationError, Aggregator};
use crate::backend::ResourceSource;
use crate::config::{AggregationConfig, FailurePolicy};
use crate::processing::event::{HeaderSet, ProcessingDecision};
use crate::processing::headers::extract_identifier;

/// Turns request headers into a passthrough or a body replacement.
#[derive(Debug)]
pub struct ResponseBuilder<S> {
    aggregator: Aggregator<S>,
    identifier_header: String,
    failure_policy: FailurePolicy,
}

impl<S: ResourceSource> ResponseBuilder<S> {
    pub fn new(aggregator: Aggregator<S>, config: &AggregationConfig) -> Self {
        Self {
            aggregator,
            identifier_header: config.identifier_header.clone(),
            failure_policy: config.failure_policy,
        }
    }

    pub fn aggregator(&self) -> &Aggregator<S> {
        &self.aggregator
    }

    /// Build the decision for one request-headers event.
    ///
    /// An error is only returned under `FailurePolicy::Reject`.
    pub async fn build(&self, headers: &HeaderSet) -> Result<ProcessingDecision, AggregationError> {
        let Some(user_id) = extract_identifier(headers, &self.identifier_header) else {
            tracing::debug!("No identifier header, passing request through");
            return Ok(ProcessingDecision::passthrough());
        };

        let span = tracing::info_span!("aggregate", user_id = %user_id);
        match self.aggregator.aggregate(&user_id).instrument(span).await {
            Ok(body) => Ok(ProcessingDecision::ContinueAndReplace {
                body: body.into_bytes(),
            }),
            Err(e) => match self.failure_policy {
                FailurePolicy::Reject => Err(e),
                FailurePolicy::Passthrough => {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "Aggregation failed, passing request through unmodified"
                    );
                    Ok(ProcessingDecision::passthrough())
                }
            },
        }
    }
}
