//! Tracer that honours the contract and emits nothing.

use opentelemetry::propagation::{Extractor, Injector};

use crate::tracer::{Span, SpanContext, SpanOptions, Tracer};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl NoopTracer {
    pub fn new() -> Self {
        Self
    }
}

impl Tracer for NoopTracer {
    fn backend(&self) -> &'static str {
        "noop"
    }

    fn extract(&self, _carrier: &dyn Extractor) -> Option<SpanContext> {
        None
    }

    fn inject(&self, _context: &SpanContext, _carrier: &mut dyn Injector) {}

    fn start_span(&self, _options: SpanOptions) -> Span {
        Span::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::TracerExt;
    use std::collections::HashMap;

    #[test]
    fn test_noop_tracer_ignores_everything() {
        let tracer = NoopTracer::new();
        let mut headers = HashMap::new();
        headers.insert("x-b3-traceid".to_string(), "abc".to_string());
        headers.insert("x-b3-spanid".to_string(), "def".to_string());

        assert!(tracer.extract(&headers).is_none());

        let span = tracer.build_span("GET").with_tag("http.method", "GET").start();
        assert!(span.is_noop());
        assert!(!span.finish());

        let mut outbound: HashMap<String, String> = HashMap::new();
        tracer.inject(&SpanContext::new_root(true), &mut outbound);
        assert!(outbound.is_empty());
    }
}
