//! Envoy external processing service that aggregates backend data into the request body.

pub mod aggregation;
pub mod backend;
pub mod cli;
pub mod config;
pub mod grpc;
pub mod lifecycle;
pub mod observability;
pub mod processing;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ServiceConfig;
pub use grpc::GrpcServer;
pub use lifecycle::Shutdown;
