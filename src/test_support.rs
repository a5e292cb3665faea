//! In-memory backend used by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;

use crate::backend::{FetchError, ResourceKind, ResourceSource};

pub const ALBUMS: &str = r#"[{"id":1,"userId":42,"title":"x"}]"#;
pub const POSTS: &str = r#"[{"id":9,"userId":42,"title":"y","body":"z"}]"#;

/// Serves canned bodies per resource, optionally after a delay.
pub struct MockSource {
    albums: Result<&'static str, FetchError>,
    posts: Result<&'static str, FetchError>,
    albums_delay: Duration,
    posts_delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub completed: AtomicUsize,
}

impl MockSource {
    pub fn new(
        albums: Result<&'static str, FetchError>,
        posts: Result<&'static str, FetchError>,
    ) -> Self {
        Self {
            albums,
            posts,
            albums_delay: Duration::ZERO,
            posts_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn ok() -> Self {
        Self::new(Ok(ALBUMS), Ok(POSTS))
    }

    pub fn with_delays(mut self, albums: Duration, posts: Duration) -> Self {
        self.albums_delay = albums;
        self.posts_delay = posts;
        self
    }
}

impl ResourceSource for MockSource {
    async fn fetch_raw(&self, kind: ResourceKind, _identifier: &str) -> Result<Bytes, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let (body, delay) = match kind {
            ResourceKind::Albums => (&self.albums, self.albums_delay),
            ResourceKind::Posts => (&self.posts, self.posts_delay),
        };
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        body.clone().map(|b| Bytes::from_static(b.as_bytes()))
    }
}
