//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → TRACING_SYSTEM / ZIPKIN_SERVER_URL / JAEGER_SERVER_URL
//!     → validation.rs (semantic checks)
//!     → AlohaConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AlohaConfig, ReporterConfig, TracingConfig, TracingSystem};
