//! Backend data-fetch subsystem.
//!
//! # Data Flow
//! ```text
//! Aggregator
//!     → client.rs (build URL, GET, optional deadline)
//!     → types.rs (decode JSON array into Album / Post)
//!     → Vec<T> or FetchError back to the aggregator
//! ```
//!
//! # Design Decisions
//! - Every failure is request-scoped; nothing here can stop the process
//! - Transport, timeout, status and decode failures are distinct errors

pub mod client;
pub mod types;

pub use client::{fetch, HttpResourceSource, ResourceSource};
pub use types::{Album, FetchError, FetchResult, Post, ResourceKind};
