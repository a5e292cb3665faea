//! Concurrent albums + posts aggregation.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::backend::{fetch, Album, FetchError, FetchResult, Post, ResourceKind, ResourceSource};
use crate::observability::metrics;

/// Composite body sent back to the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedPayload {
    pub albums: Vec<Album>,
    pub posts: Vec<Post>,
}

/// Errors that fail a whole aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// One of the two backend calls failed.
    #[error("fetching {resource} failed: {source}")]
    Fetch {
        resource: ResourceKind,
        source: FetchError,
    },

    /// The merged payload could not be serialized.
    #[error("serializing aggregated payload failed: {0}")]
    Serialize(String),
}

/// Fans out to both resource collections and merges the results.
#[derive(Debug)]
pub struct Aggregator<S> {
    source: S,
}

impl<S: ResourceSource> Aggregator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch albums and posts for `identifier` concurrently and return the JSON payload.
    ///
    /// Both calls always run to completion before the result is decided; if
    /// either failed no payload is produced.
    pub async fn aggregate(&self, identifier: &str) -> Result<String, AggregationError> {
        let start = Instant::now();

        let (albums, posts) = tokio::join!(
            fetch::<Album, _>(&self.source, ResourceKind::Albums, identifier),
            fetch::<Post, _>(&self.source, ResourceKind::Posts, identifier),
        );

        let elapsed = start.elapsed();
        let result = merge(albums, posts).and_then(|payload| {
            serde_json::to_string(&payload).map_err(|e| AggregationError::Serialize(e.to_string()))
        });

        tracing::info!(
            user_id = %identifier,
            duration_ms = elapsed.as_millis() as u64,
            success = result.is_ok(),
            "Aggregation finished"
        );
        metrics::record_aggregation(result.is_ok(), elapsed);

        result
    }
}

fn merge(
    albums: FetchResult<Album>,
    posts: FetchResult<Post>,
) -> Result<AggregatedPayload, AggregationError> {
    let albums = albums.map_err(|source| AggregationError::Fetch {
        resource: ResourceKind::Albums,
        source,
    })?;
    let posts = posts.map_err(|source| AggregationError::Fetch {
        resource: ResourceKind::Posts,
        source,
    })?;
    Ok(AggregatedPayload { albums, posts })
}
