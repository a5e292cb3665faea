//! External processing subsystem.
//!
//! # Data Flow
//! ```text
//! ProcessingRequest (wire)
//!     → event.rs (ProcessingEvent)
//!     → stream.rs (dispatch by kind)
//!         request headers → builder.rs
//!             → headers.rs (identifier lookup)
//!             → aggregation (if identifier present)
//!         anything else   → empty decision
//!     → event.rs (ProcessingDecision → ProcessingResponse)
//!     → sent before the next receive
//! ```
//!
//! # Design Decisions
//! - Exactly one response per received message, in order
//! - Wire types are converted at the edge; the core works on plain enums

pub mod builder;
pub mod event;
pub mod headers;
pub mod stream;

pub use builder::ResponseBuilder;
pub use event::{Header, HeaderSet, Phase, ProcessingDecision, ProcessingEvent};
pub use headers::{extract_identifier, DEFAULT_IDENTIFIER_HEADER};
pub use stream::{ResponseSender, StreamHandler, StreamOutcome};
