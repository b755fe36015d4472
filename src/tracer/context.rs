//! Span identity carried across process boundaries.
//!
//! # Responsibilities
//! - Trace and span identifiers with hex encoding
//! - Sampling and debug flags
//! - Baggage items propagated alongside the identifiers

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;

/// Identifier shared by every span of one trace.
///
/// Zipkin and Jaeger both allow 64 or 128 bit trace ids; `high` is zero for
/// the 64 bit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId {
    pub high: u64,
    pub low: u64,
}

impl TraceId {
    /// Generate a new random 64 bit trace id.
    pub fn random() -> Self {
        Self {
            high: 0,
            low: random_nonzero(),
        }
    }

    /// Lower-case hex, 16 characters for 64 bit ids and 32 for 128 bit ids.
    pub fn to_hex(&self) -> String {
        if self.high == 0 {
            format!("{:016x}", self.low)
        } else {
            format!("{:016x}{:016x}", self.high, self.low)
        }
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Identifier of a single span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(pub u64);

impl SpanId {
    pub fn random() -> Self {
        Self(random_nonzero())
    }

    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The immutable identifiers needed to continue a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_id: Option<SpanId>,
    pub sampled: bool,
    pub debug: bool,
    pub baggage: BTreeMap<String, String>,
}

impl SpanContext {
    /// Context for the first span of a new trace.
    pub fn new_root(sampled: bool) -> Self {
        Self {
            trace_id: TraceId::random(),
            span_id: SpanId::random(),
            parent_id: None,
            sampled,
            debug: false,
            baggage: BTreeMap::new(),
        }
    }

    /// Context for a span caused by the span this context identifies.
    ///
    /// The trace id, flags and baggage carry over; the span id is fresh.
    pub fn new_child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: SpanId::random(),
            parent_id: Some(self.span_id),
            sampled: self.sampled,
            debug: self.debug,
            baggage: self.baggage.clone(),
        }
    }

    pub fn baggage_item(&self, key: &str) -> Option<&str> {
        self.baggage.get(key).map(String::as_str)
    }

    pub fn with_baggage_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.baggage.insert(key.into(), value.into());
        self
    }
}

fn random_nonzero() -> u64 {
    let mut rng = rand::thread_rng();
    loop {
        let id: u64 = rng.gen();
        if id != 0 {
            return id;
        }
    }
}
