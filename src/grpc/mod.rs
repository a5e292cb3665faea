//! gRPC protocol subsystem.
//!
//! # Data Flow
//! ```text
//! TCP listener
//!     → server.rs (tonic server, HTTP/2 stream limit)
//!         /envoy.service.ext_proc.v3.ExternalProcessor/Process
//!             → one task per stream (processing::StreamHandler)
//!         /grpc.health.v1.Health/*
//!             → health.rs
//! ```

pub mod health;
pub mod server;

pub use health::HealthService;
pub use server::{ExtProcService, GrpcServer, ServerError};
