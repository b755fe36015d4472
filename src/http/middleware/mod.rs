//! Tracing middleware.
//!
//! Layer order, outermost first:
//! ```text
//! trace_request   (span lifecycle)
//!     → trace_failure   (error tagging)
//!         → CatchPanicLayer (panic → 500 + RequestFailure)
//!             → handler
//! ```

pub mod active_span;
pub mod trace_failure;
pub mod trace_request;

pub use active_span::{ActiveSpan, ACTIVE_SPAN};
pub use trace_failure::trace_failure;
pub use trace_request::trace_request;
