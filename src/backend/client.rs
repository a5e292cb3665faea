//! Backend HTTP client.
//!
//! # Responsibilities
//! - Build `/users/<id>/<resource>` URLs from the configured base URL
//! - Issue one GET per call, with an optional deadline
//! - Decode the JSON array body into typed records
//!
//! # Design Decisions
//! - No retries; failures are returned to the caller as `FetchError`
//! - The identifier is pushed as a single encoded path segment
//! - Transport is behind `ResourceSource` so decoding can be exercised without a network

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

use crate::backend::types::{FetchError, FetchResult, ResourceKind};
use crate::config::BackendConfig;
use crate::observability::metrics;

/// Source of raw resource bodies.
pub trait ResourceSource: Send + Sync + 'static {
    /// Fetch the raw body of `kind` for `identifier`.
    fn fetch_raw(
        &self,
        kind: ResourceKind,
        identifier: &str,
    ) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}

/// Fetch one resource collection and decode it as a JSON array of `T`.
pub async fn fetch<T, S>(source: &S, kind: ResourceKind, identifier: &str) -> FetchResult<T>
where
    T: DeserializeOwned,
    S: ResourceSource,
{
    let result = match source.fetch_raw(kind, identifier).await {
        Ok(body) => {
            serde_json::from_slice::<Vec<T>>(&body).map_err(|e| FetchError::Decode(e.to_string()))
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        tracing::warn!(resource = %kind, user_id = %identifier, error = %e, "Backend fetch failed");
        metrics::record_fetch_error(kind, e);
    }
    result
}

/// `ResourceSource` backed by a `reqwest` client.
#[derive(Clone)]
pub struct HttpResourceSource {
    client: reqwest::Client,
    base_url: Url,
    timeout: Option<Duration>,
}

impl HttpResourceSource {
    /// Create a new client from backend configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(config.base_url.clone()));
        }

        let mut builder =
            reqwest::Client::builder().connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if !config.use_env_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let timeout = match config.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Build the URL of one resource collection.
    pub fn resource_url(&self, kind: ResourceKind, identifier: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("users")
            .push(identifier)
            .push(kind.path());
        Ok(url)
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        match self.timeout {
            Some(timeout) if error.is_timeout() => FetchError::Timeout(timeout),
            _ => FetchError::Transport(error.to_string()),
        }
    }
}

impl ResourceSource for HttpResourceSource {
    async fn fetch_raw(&self, kind: ResourceKind, identifier: &str) -> Result<Bytes, FetchError> {
        let url = self.resource_url(kind, identifier)?;
        tracing::info!(resource = %kind, user_id = %identifier, url = %url, "Fetching resource");

        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.bytes().await.map_err(|e| self.classify(e))
    }
}

impl std::fmt::Debug for HttpResourceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResourceSource")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}
