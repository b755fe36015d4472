//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight requests drain
//!     → main closes the tracer (final span flush)
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
