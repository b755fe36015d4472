//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, access log, timeout)
//!     → middleware/trace_request.rs (server span, ActiveSpan)
//!     → middleware/trace_failure.rs (error tag + log on RequestFailure)
//!     → handlers.rs
//!     → body.rs (status tag, finish at body end)
//!     → Send to client
//! ```

pub mod body;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use error::{AppError, RequestFailure};
pub use middleware::{ActiveSpan, ACTIVE_SPAN};
pub use server::{build_router, instrument, HttpServer};
