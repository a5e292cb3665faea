//! Backend record types and error definitions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resource collections the backend exposes per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Albums,
    Posts,
}

impl ResourceKind {
    /// Final path segment for this resource.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Albums => "albums",
            ResourceKind::Posts => "posts",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// An album owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
}

/// A post written by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
}

/// Errors that can occur while fetching one resource collection.
///
/// Every variant is scoped to the request that triggered the fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection, TLS or IO failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// The body was not a JSON array of the expected records.
    #[error("decode error: {0}")]
    Decode(String),

    /// The resource URL could not be built from the base URL and identifier.
    #[error("invalid resource url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Timeout(_) => "timeout",
            FetchError::Status(_) => "status",
            FetchError::Decode(_) => "decode",
            FetchError::InvalidUrl(_) => "invalid_url",
        }
    }
}

/// Result type for backend fetches.
pub type FetchResult<T> = Result<Vec<T>, FetchError>;
