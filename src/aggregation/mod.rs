//! Aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! identifier
//!     → fetch albums ─┐
//!     → fetch posts  ─┴→ join both → merge → JSON
//! ```
//!
//! # Design Decisions
//! - Fan-in waits for both branches even when one fails early
//! - All or nothing: a failed branch fails the aggregation, no partial body
//! - Duration of the fan-out/fan-in window is logged and recorded as a metric

pub mod aggregator;

pub use aggregator::{AggregatedPayload, AggregationError, Aggregator};
