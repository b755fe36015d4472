//! Bridge between the `opentelemetry` propagators and [`SpanContext`].
//!
//! # Data Flow
//! ```text
//! Extractor → TextMapPropagator::extract_with_context → otel Context
//!     → remote SpanContext + Baggage → crate SpanContext
//!
//! crate SpanContext → otel Context (remote span + baggage)
//!     → TextMapPropagator::inject_context → Injector
//! ```
//!
//! # Design Decisions
//! - Both B3 and Jaeger propagators mark debug with flag bit `0x04`
//! - B3 deferred sampling (flag bit `0x02`) is treated as sampled
//! - The propagators drop the upstream parent id, so extracted contexts are
//!   always parentless; the continued span records the upstream span as its
//!   parent

use opentelemetry::baggage::BaggageExt;
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{
    SpanContext as RemoteSpanContext, SpanId as RemoteSpanId, TraceContextExt, TraceFlags,
    TraceId as RemoteTraceId, TraceState,
};
use opentelemetry::{Context, KeyValue};

use crate::tracer::{SpanContext, SpanId, TraceId};

const TRACE_FLAG_DEFERRED: u8 = 0x02;
const TRACE_FLAG_DEBUG: u8 = 0x04;

const B3_TRACE_ID_HEADER: &str = "x-b3-traceid";
const B3_ID_HEADERS: [&str; 3] = [B3_TRACE_ID_HEADER, "x-b3-spanid", "x-b3-parentspanid"];

/// Decode a parent context with `propagator`. `None` when no valid remote
/// span was found.
pub(crate) fn extract_context(
    propagator: &dyn TextMapPropagator,
    carrier: &dyn Extractor,
) -> Option<SpanContext> {
    let cx = propagator.extract_with_context(&Context::new(), carrier);
    let span = cx.span();
    let remote = span.span_context();
    if !remote.is_valid() {
        return None;
    }

    let flags = remote.trace_flags().to_u8();
    let trace_id = u128::from_be_bytes(remote.trace_id().to_bytes());
    let baggage = cx
        .baggage()
        .iter()
        .map(|(key, (value, _))| (key.as_str().to_string(), value.as_str().to_string()))
        .collect();

    Some(SpanContext {
        trace_id: TraceId {
            high: (trace_id >> 64) as u64,
            low: trace_id as u64,
        },
        span_id: SpanId(u64::from_be_bytes(remote.span_id().to_bytes())),
        parent_id: None,
        sampled: remote.is_sampled() || flags & (TRACE_FLAG_DEFERRED | TRACE_FLAG_DEBUG) != 0,
        debug: flags & TRACE_FLAG_DEBUG != 0,
        baggage,
    })
}

/// Encode `context` into `carrier` with `propagator`.
pub(crate) fn inject_context(
    propagator: &dyn TextMapPropagator,
    context: &SpanContext,
    carrier: &mut dyn Injector,
) {
    let mut flags = TraceFlags::default();
    if context.sampled {
        flags = flags | TraceFlags::SAMPLED;
    }
    if context.debug {
        flags = flags | TraceFlags::new(TRACE_FLAG_DEBUG);
    }

    let trace_id = (u128::from(context.trace_id.high) << 64) | u128::from(context.trace_id.low);
    let remote = RemoteSpanContext::new(
        RemoteTraceId::from_bytes(trace_id.to_be_bytes()),
        RemoteSpanId::from_bytes(context.span_id.0.to_be_bytes()),
        flags,
        true,
        TraceState::default(),
    );
    let cx = Context::new().with_remote_span_context(remote).with_baggage(
        context
            .baggage
            .iter()
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone())),
    );
    propagator.inject_context(&cx, carrier);
}

/// Left-pads B3 ids sent without leading zeros.
///
/// The B3 propagator only accepts 16 or 32 character ids; upstream Zipkin
/// clients commonly drop leading zeros from 64 bit ids.
pub(crate) struct PaddedB3Ids<'a> {
    inner: &'a dyn Extractor,
    padded: Vec<(&'static str, String)>,
}

impl<'a> PaddedB3Ids<'a> {
    pub(crate) fn new(inner: &'a dyn Extractor) -> Self {
        let padded = B3_ID_HEADERS
            .iter()
            .filter_map(|&name| {
                let value = inner.get(name)?.trim();
                let width = if name == B3_TRACE_ID_HEADER && value.len() > 16 {
                    32
                } else {
                    16
                };
                let short = !value.is_empty() && value.len() < width;
                (short && value.bytes().all(|b| b.is_ascii_hexdigit()))
                    .then(|| (name, format!("{value:0>width$}")))
            })
            .collect();
        Self { inner, padded }
    }
}

impl Extractor for PaddedB3Ids<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.padded
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
            .or_else(|| self.inner.get(key))
    }

    fn keys(&self) -> Vec<&str> {
        self.inner.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_short_b3_ids_are_padded() {
        let headers: HashMap<String, String> = [
            ("x-b3-traceid", "abc"),
            ("x-b3-spanid", "def"),
            ("x-b3-sampled", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let padded = PaddedB3Ids::new(&headers);
        assert_eq!(padded.get("X-B3-TraceId"), Some("0000000000000abc"));
        assert_eq!(padded.get("x-b3-spanid"), Some("0000000000000def"));
        assert_eq!(padded.get("x-b3-sampled"), Some("1"));
        assert_eq!(padded.get("x-b3-parentspanid"), None);
    }

    #[test]
    fn test_long_trace_id_pads_to_128_bits() {
        let headers: HashMap<String, String> =
            [("x-b3-traceid".to_string(), "1".repeat(20))].into_iter().collect();

        let padded = PaddedB3Ids::new(&headers);
        assert_eq!(padded.get("x-b3-traceid"), Some(format!("{:0>32}", "1".repeat(20)).as_str()));
    }

    #[test]
    fn test_non_hex_ids_are_left_alone() {
        let headers: HashMap<String, String> =
            [("x-b3-traceid".to_string(), "xyz".to_string())].into_iter().collect();

        let padded = PaddedB3Ids::new(&headers);
        assert_eq!(padded.get("x-b3-traceid"), Some("xyz"));
    }
}
