//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! main
//!     → logging.rs (tracing-subscriber registry, EnvFilter, fmt/json)
//!     → tracing.rs (select Noop / Zipkin / Jaeger from the environment)
//!
//! reporter tasks
//!     → metrics.rs (reported / dropped / failed span counters)
//! ```
//!
//! # Design Decisions
//! - `tracing` is the in-process log facade; request traces use the
//!   crate's own `Tracer`
//! - Metrics are cheap facade calls with no exporter behind them

pub mod logging;
pub mod metrics;
pub mod tracing;
