//! aloha: a small HTTP service with distributed-tracing instrumentation.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ trace_request ──▶ trace_failure ──▶ handlers
//!                          │                 │
//!                          │                 ▼
//!                          │            tracer (Noop / Zipkin / Jaeger)
//!                          │                 │ Span::finish
//!                          │                 ▼
//!                          │            reporter (buffered, background flush)
//!                          │                 │
//!                          │                 ├──▶ Zipkin collector (HTTP, JSON v1)
//!                          │                 └──▶ Jaeger agent (UDP, Thrift compact)
//!                          ▼
//!     Cross-cutting: config (TOML + env), observability (logs, selector,
//!     metrics), lifecycle (shutdown)
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod reporter;
pub mod tracer;

pub use config::schema::AlohaConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use tracer::{SharedTracer, Tracer};
