//! Jaeger tracer with `uber-trace-id` propagation.
//!
//! # Responsibilities
//! - Decode and encode the `uber-trace-id` header through the Jaeger propagator
//! - Carry baggage in the W3C `baggage` header
//! - Apply the probabilistic sampler to new traces
//! - Start spans that report through the Jaeger reporter
//!
//! # Header Format
//! ```text
//! uber-trace-id: {trace-id}:{span-id}:{parent-span-id}:{flags}
//!     all fields hex, `:` may arrive url-encoded as %3A
//!     flags bit 0 = sampled, bit 1 = debug
//! ```

use std::sync::Arc;

use opentelemetry::propagation::{Extractor, Injector, TextMapCompositePropagator};
use opentelemetry_jaeger_propagator::Propagator as JaegerPropagator;
use opentelemetry_sdk::propagation::BaggagePropagator;

use crate::reporter::Reporter;
use crate::tracer::propagation::{extract_context, inject_context};
use crate::tracer::tags;
use crate::tracer::{Span, SpanContext, SpanOptions, TagValue, TraceId, Tracer};

/// Samples a fixed fraction of new traces.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilisticSampler {
    rate: f64,
}

impl ProbabilisticSampler {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn is_sampled(&self, trace_id: TraceId) -> bool {
        if self.rate >= 1.0 {
            return true;
        }
        let boundary = (self.rate * i64::MAX as f64) as u64;
        (trace_id.low & i64::MAX as u64) < boundary
    }
}

pub struct JaegerTracer {
    reporter: Arc<dyn Reporter>,
    sampler: ProbabilisticSampler,
    propagator: TextMapCompositePropagator,
}

impl JaegerTracer {
    pub fn new(reporter: Arc<dyn Reporter>, sampler: ProbabilisticSampler) -> Self {
        Self {
            reporter,
            sampler,
            propagator: TextMapCompositePropagator::new(vec![
                Box::new(JaegerPropagator::new()),
                Box::new(BaggagePropagator::new()),
            ]),
        }
    }
}

impl Tracer for JaegerTracer {
    fn backend(&self) -> &'static str {
        "jaeger"
    }

    fn extract(&self, carrier: &dyn Extractor) -> Option<SpanContext> {
        extract_context(&self.propagator, carrier)
    }

    fn inject(&self, context: &SpanContext, carrier: &mut dyn Injector) {
        inject_context(&self.propagator, context, carrier);
    }

    fn start_span(&self, options: SpanOptions) -> Span {
        let mut span_tags = options.tags;
        let context = match &options.parent {
            Some(parent) => parent.new_child(),
            None => {
                let mut context = SpanContext::new_root(false);
                context.sampled = self.sampler.is_sampled(context.trace_id);
                if context.sampled {
                    span_tags.insert(tags::SAMPLER_TYPE.to_string(), "probabilistic".into());
                    span_tags.insert(
                        tags::SAMPLER_PARAM.to_string(),
                        TagValue::F64(self.sampler.rate()),
                    );
                }
                context
            }
        };
        Span::start(
            context,
            options.operation_name,
            span_tags,
            self.reporter.clone(),
        )
    }

    fn close(&self) {
        self.reporter.close();
    }
}
