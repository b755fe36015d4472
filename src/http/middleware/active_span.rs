//! Per-request span slot.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};

use crate::tracer::{HeaderInjector, Span, Tracer};

/// Name of the per-request slot holding the server span.
///
/// Request extensions are keyed by type, so the slot itself is
/// [`ActiveSpan`]; the name is kept for logs and external tooling.
pub const ACTIVE_SPAN: &str = "tracing.active_span";

/// The server span of the current request.
///
/// Inserted by the request middleware and readable from handlers as an
/// extractor. Outside the middleware the extractor yields a no-op span.
#[derive(Debug, Clone)]
pub struct ActiveSpan(Span);

impl ActiveSpan {
    pub fn new(span: Span) -> Self {
        Self(span)
    }

    pub fn span(&self) -> &Span {
        &self.0
    }

    pub fn from_extensions(extensions: &Extensions) -> Option<&ActiveSpan> {
        extensions.get::<ActiveSpan>()
    }

    /// Write propagation headers for a downstream call made on behalf of
    /// this request.
    pub fn inject_into(&self, tracer: &dyn Tracer, headers: &mut HeaderMap) {
        if let Some(context) = self.0.context() {
            tracer.inject(context, &mut HeaderInjector::new(headers));
        }
    }
}

impl<S> FromRequestParts<S> for ActiveSpan
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ActiveSpan>()
            .cloned()
            .unwrap_or_else(|| ActiveSpan(Span::noop())))
    }
}
