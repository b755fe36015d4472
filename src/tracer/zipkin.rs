//! Zipkin tracer with B3 header propagation.
//!
//! # Responsibilities
//! - Decode and encode B3 multi-header context through the B3 propagator
//! - Carry baggage in the W3C `baggage` header
//! - Start spans that report through the Zipkin reporter
//!
//! # Design Decisions
//! - A continued span gets its own span id; the upstream span becomes its
//!   parent (no shared server/client span ids)
//! - An explicit `X-B3-Sampled: 0` is honoured, missing means sample
//! - `X-B3-Flags: 1` marks debug, which always reports

use std::sync::Arc;

use opentelemetry::propagation::{Extractor, Injector, TextMapCompositePropagator};
use opentelemetry_sdk::propagation::BaggagePropagator;
use opentelemetry_zipkin::Propagator as B3Propagator;

use crate::reporter::Reporter;
use crate::tracer::propagation::{extract_context, inject_context, PaddedB3Ids};
use crate::tracer::{Span, SpanContext, SpanOptions, Tracer};

pub struct ZipkinTracer {
    reporter: Arc<dyn Reporter>,
    propagator: TextMapCompositePropagator,
}

impl ZipkinTracer {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            reporter,
            propagator: TextMapCompositePropagator::new(vec![
                Box::new(B3Propagator::new()),
                Box::new(BaggagePropagator::new()),
            ]),
        }
    }
}

impl Tracer for ZipkinTracer {
    fn backend(&self) -> &'static str {
        "zipkin"
    }

    fn extract(&self, carrier: &dyn Extractor) -> Option<SpanContext> {
        extract_context(&self.propagator, &PaddedB3Ids::new(carrier))
    }

    fn inject(&self, context: &SpanContext, carrier: &mut dyn Injector) {
        inject_context(&self.propagator, context, carrier);
    }

    fn start_span(&self, options: SpanOptions) -> Span {
        let context = match &options.parent {
            Some(parent) => parent.new_child(),
            None => SpanContext::new_root(true),
        };
        Span::start(
            context,
            options.operation_name,
            options.tags,
            self.reporter.clone(),
        )
    }

    fn close(&self) {
        self.reporter.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::memory::InMemoryReporter;
    use crate::tracer::{SpanId, TraceId, TracerExt};
    use std::collections::HashMap;

    fn tracer() -> (ZipkinTracer, InMemoryReporter) {
        let reporter = InMemoryReporter::new();
        (ZipkinTracer::new(Arc::new(reporter.clone())), reporter)
    }

    fn carrier(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_b3_headers() {
        let (tracer, _) = tracer();
        let headers = carrier(&[
            ("x-b3-traceid", "463ac35c9f6413ad48485a3953bb6124"),
            ("x-b3-spanid", "a2fb4a1d1a96d312"),
            ("x-b3-parentspanid", "0020000000000001"),
            ("x-b3-sampled", "1"),
            ("baggage", "user=kai"),
        ]);

        let context = tracer.extract(&headers).unwrap();
        assert_eq!(context.trace_id.high, 0x463ac35c9f6413ad);
        assert_eq!(context.trace_id.low, 0x48485a3953bb6124);
        assert_eq!(context.span_id, SpanId(0xa2fb4a1d1a96d312));
        assert_eq!(context.parent_id, None);
        assert!(context.sampled);
        assert!(!context.debug);
        assert_eq!(context.baggage_item("user"), Some("kai"));
    }

    #[test]
    fn test_extract_pads_short_ids() {
        let (tracer, _) = tracer();
        let context = tracer
            .extract(&carrier(&[("x-b3-traceid", "abc"), ("x-b3-spanid", "def")]))
            .unwrap();
        assert_eq!(context.trace_id, TraceId { high: 0, low: 0xabc });
        assert_eq!(context.span_id, SpanId(0xdef));
        assert!(context.sampled);
    }

    #[test]
    fn test_extract_requires_trace_and_span_id() {
        let (tracer, _) = tracer();
        assert!(tracer.extract(&carrier(&[])).is_none());
        assert!(tracer.extract(&carrier(&[("x-b3-traceid", "abc")])).is_none());
        assert!(tracer
            .extract(&carrier(&[("x-b3-traceid", "zz"), ("x-b3-spanid", "def")]))
            .is_none());
    }

    #[test]
    fn test_sampling_flags() {
        let (tracer, reporter) = tracer();
        let unsampled = tracer
            .extract(&carrier(&[
                ("x-b3-traceid", "abc"),
                ("x-b3-spanid", "def"),
                ("x-b3-sampled", "0"),
            ]))
            .unwrap();
        assert!(!unsampled.sampled);

        tracer.build_span("GET").child_of(Some(unsampled)).start().finish();
        assert!(reporter.spans().is_empty());

        let debug = tracer
            .extract(&carrier(&[
                ("x-b3-traceid", "abc"),
                ("x-b3-spanid", "def"),
                ("x-b3-flags", "1"),
            ]))
            .unwrap();
        assert!(debug.debug);
        tracer.build_span("GET").child_of(Some(debug)).start().finish();
        assert_eq!(reporter.spans().len(), 1);
    }

    #[test]
    fn test_child_span_continues_trace() {
        let (tracer, reporter) = tracer();
        let parent = tracer
            .extract(&carrier(&[("x-b3-traceid", "abc"), ("x-b3-spanid", "def")]))
            .unwrap();

        let span = tracer
            .build_span("GET")
            .child_of(Some(parent))
            .with_tag("span.kind", "server")
            .start();
        span.finish();

        let spans = reporter.spans();
        let finished = &spans[0];
        assert_eq!(finished.context.trace_id.low, 0xabc);
        assert_eq!(finished.context.parent_id, Some(SpanId(0xdef)));
        assert_ne!(finished.context.span_id, SpanId(0xdef));
        assert_eq!(finished.operation_name, "GET");
    }

    #[test]
    fn test_inject_round_trips_through_extract() {
        let (tracer, _) = tracer();
        let context = SpanContext::new_root(true).with_baggage_item("user", "kai");

        let mut outbound: HashMap<String, String> = HashMap::new();
        tracer.inject(&context, &mut outbound);
        assert_eq!(outbound["x-b3-traceid"], format!("{:032x}", context.trace_id.low));
        assert_eq!(outbound["x-b3-spanid"], context.span_id.to_hex());
        assert_eq!(outbound["x-b3-sampled"], "1");
        assert_eq!(outbound["baggage"], "user=kai");

        let extracted = tracer.extract(&outbound).unwrap();
        assert_eq!(extracted, context);
    }

    #[test]
    fn test_inject_debug_sets_flags_header() {
        let (tracer, _) = tracer();
        let mut context = SpanContext::new_root(true);
        context.debug = true;

        let mut outbound: HashMap<String, String> = HashMap::new();
        tracer.inject(&context, &mut outbound);
        assert_eq!(outbound["x-b3-flags"], "1");
        assert!(tracer.extract(&outbound).unwrap().debug);
    }
}
