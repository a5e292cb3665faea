//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (cli.rs)
//!     → validation.rs (semantic checks, once, on the final result)
//!     → ServiceConfig (validated, immutable)
//!     → handed to each subsystem at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, read_config, ConfigError};
pub use schema::{
    AggregationConfig, BackendConfig, FailurePolicy, ListenerConfig, LogFormat,
    ObservabilityConfig, ServiceConfig, ShutdownConfig,
};
pub use validation::{validate_config, ValidationError};
