//! Tracer contract and its backends.
//!
//! # Data Flow
//! ```text
//! inbound headers
//!     → carrier.rs (HeaderExtractor, read-only)
//!     → Tracer::extract → propagation.rs (B3 / Jaeger propagator)
//!     → Option<SpanContext>
//!     → Tracer::build_span(..).child_of(..).with_tag(..).start() → Span
//!     → Span::finish → FinishedSpan
//!     → reporter (Zipkin HTTP / Jaeger UDP / in-memory)
//!
//! outbound headers
//!     ← Tracer::inject(SpanContext, HeaderInjector)
//! ```
//!
//! # Design Decisions
//! - One capability trait, three implementors (noop, zipkin, jaeger)
//! - Middleware only ever sees `SharedTracer`
//! - Extraction never errors: anything unparseable means "no parent"

pub mod carrier;
pub mod context;
pub mod jaeger;
pub mod noop;
mod propagation;
pub mod span;
pub mod tags;
pub mod zipkin;

use std::sync::Arc;

use opentelemetry::propagation::{Extractor, Injector};

pub use carrier::{HeaderExtractor, HeaderInjector};
pub use context::{SpanContext, SpanId, TraceId};
pub use jaeger::{JaegerTracer, ProbabilisticSampler};
pub use noop::NoopTracer;
pub use span::{FinishedSpan, LogRecord, Span, SpanBuilder, SpanOptions, TagValue};
pub use zipkin::ZipkinTracer;

/// Local service name reported by every backend.
pub const SERVICE_NAME: &str = "aloha";

/// The process-wide tracer handle.
pub type SharedTracer = Arc<dyn Tracer>;

/// Capabilities the HTTP layer needs from a tracing backend.
pub trait Tracer: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Decode a parent context from a carrier.
    fn extract(&self, carrier: &dyn Extractor) -> Option<SpanContext>;

    /// Encode `context` into an outbound carrier.
    fn inject(&self, context: &SpanContext, carrier: &mut dyn Injector);

    /// Start a span from collected options. See [`TracerExt::build_span`].
    fn start_span(&self, options: SpanOptions) -> Span;

    /// Stop background reporting. Spans finished afterwards are dropped.
    fn close(&self) {}
}

/// Builder entry point available on every tracer, including `dyn Tracer`.
pub trait TracerExt: Tracer {
    fn build_span(&self, operation_name: &str) -> SpanBuilder<'_, Self> {
        SpanBuilder::new(self, operation_name)
    }
}

impl<T: Tracer + ?Sized> TracerExt for T {}
