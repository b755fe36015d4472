//! Spans and their builder.
//!
//! # Responsibilities
//! - Hold the mutable part of a span (tags, logs, finish time)
//! - Hand finished spans to the tracer's reporter exactly once
//!
//! # Design Decisions
//! - `Span` is a cheap clonable handle so it can live in request extensions
//!   and in the response body wrapper at the same time
//! - Interior state sits behind a mutex; a poisoned lock is recovered because
//!   tracing must never fail a request
//! - A no-op span carries no state at all

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use crate::reporter::Reporter;
use crate::tracer::{SpanContext, Tracer};

/// Value of a span tag or log field.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    String(String),
    Bool(bool),
    I64(i64),
    F64(f64),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::String(v) => f.write_str(v),
            TagValue::Bool(v) => write!(f, "{}", v),
            TagValue::I64(v) => write!(f, "{}", v),
            TagValue::F64(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::String(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::String(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::I64(value)
    }
}

impl From<i32> for TagValue {
    fn from(value: i32) -> Self {
        TagValue::I64(i64::from(value))
    }
}

impl From<u16> for TagValue {
    fn from(value: u16) -> Self {
        TagValue::I64(i64::from(value))
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::F64(value)
    }
}

/// A structured event recorded on a span.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: SystemTime,
    pub fields: Vec<(String, TagValue)>,
}

impl LogRecord {
    pub fn field(&self, key: &str) -> Option<&TagValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Everything a reporter needs to ship a span.
#[derive(Debug, Clone)]
pub struct FinishedSpan {
    pub context: SpanContext,
    pub operation_name: String,
    pub start_time: SystemTime,
    pub finish_time: SystemTime,
    pub tags: BTreeMap<String, TagValue>,
    pub logs: Vec<LogRecord>,
}

impl FinishedSpan {
    pub fn tag(&self, key: &str) -> Option<&TagValue> {
        self.tags.get(key)
    }

    pub fn duration(&self) -> Duration {
        self.finish_time
            .duration_since(self.start_time)
            .unwrap_or_default()
    }
}

/// Options collected by [`SpanBuilder`] and handed to [`Tracer::start_span`].
#[derive(Debug, Clone)]
pub struct SpanOptions {
    pub operation_name: String,
    pub parent: Option<SpanContext>,
    pub tags: BTreeMap<String, TagValue>,
}

impl SpanOptions {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            parent: None,
            tags: BTreeMap::new(),
        }
    }
}

/// Fluent span construction bound to a tracer.
pub struct SpanBuilder<'a, T: ?Sized> {
    tracer: &'a T,
    options: SpanOptions,
}

impl<'a, T: Tracer + ?Sized> SpanBuilder<'a, T> {
    pub fn new(tracer: &'a T, operation_name: impl Into<String>) -> Self {
        Self {
            tracer,
            options: SpanOptions::new(operation_name),
        }
    }

    /// Causal parent; `None` starts a new trace.
    pub fn child_of(mut self, parent: Option<SpanContext>) -> Self {
        self.options.parent = parent;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.options.tags.insert(key.into(), value.into());
        self
    }

    /// Start the span at the current wall-clock time.
    pub fn start(self) -> Span {
        self.tracer.start_span(self.options)
    }
}

struct SpanState {
    tags: BTreeMap<String, TagValue>,
    logs: Vec<LogRecord>,
    finish_time: Option<SystemTime>,
}

struct SpanInner {
    context: SpanContext,
    operation_name: String,
    start_time: SystemTime,
    state: Mutex<SpanState>,
    reporter: Arc<dyn Reporter>,
}

/// Handle to an in-flight span.
#[derive(Clone)]
pub struct Span {
    inner: Option<Arc<SpanInner>>,
}

impl Span {
    /// A span that accepts every operation and records nothing.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Start a recording span. Used by tracer implementations.
    pub fn start(
        context: SpanContext,
        operation_name: String,
        tags: BTreeMap<String, TagValue>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            inner: Some(Arc::new(SpanInner {
                context,
                operation_name,
                start_time: SystemTime::now(),
                state: Mutex::new(SpanState {
                    tags,
                    logs: Vec::new(),
                    finish_time: None,
                }),
                reporter,
            })),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    /// Identifiers of this span; `None` for a no-op span.
    pub fn context(&self) -> Option<&SpanContext> {
        self.inner.as_ref().map(|inner| &inner.context)
    }

    pub fn set_tag(&self, key: impl Into<String>, value: impl Into<TagValue>) {
        if let Some(mut state) = self.open_state() {
            state.tags.insert(key.into(), value.into());
        }
    }

    pub fn tag(&self, key: &str) -> Option<TagValue> {
        let inner = self.inner.as_ref()?;
        lock(&inner.state).tags.get(key).cloned()
    }

    /// Record a structured event with the given fields.
    pub fn log<K, V, I>(&self, fields: I)
    where
        K: Into<String>,
        V: Into<TagValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        if let Some(mut state) = self.open_state() {
            let fields = fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect();
            state.logs.push(LogRecord {
                timestamp: SystemTime::now(),
                fields,
            });
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.inner {
            Some(inner) => lock(&inner.state).finish_time.is_some(),
            None => false,
        }
    }

    /// Stamp the end time and report the span.
    ///
    /// Only the first call has an effect; it returns `true`.
    pub fn finish(&self) -> bool {
        let Some(inner) = &self.inner else {
            return false;
        };

        let finished = {
            let mut state = lock(&inner.state);
            if state.finish_time.is_some() {
                tracing::debug!(
                    operation = %inner.operation_name,
                    span_id = %inner.context.span_id,
                    "Ignoring repeated finish"
                );
                return false;
            }
            let finish_time = SystemTime::now();
            state.finish_time = Some(finish_time);
            FinishedSpan {
                context: inner.context.clone(),
                operation_name: inner.operation_name.clone(),
                start_time: inner.start_time,
                finish_time,
                tags: std::mem::take(&mut state.tags),
                logs: std::mem::take(&mut state.logs),
            }
        };

        if finished.context.sampled || finished.context.debug {
            inner.reporter.report(finished);
        }
        true
    }

    fn open_state(&self) -> Option<MutexGuard<'_, SpanState>> {
        let inner = self.inner.as_ref()?;
        let state = lock(&inner.state);
        if state.finish_time.is_some() {
            return None;
        }
        Some(state)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("Span")
                .field("operation_name", &inner.operation_name)
                .field("trace_id", &inner.context.trace_id)
                .field("span_id", &inner.context.span_id)
                .finish(),
            None => f.write_str("Span(noop)"),
        }
    }
}

fn lock(state: &Mutex<SpanState>) -> MutexGuard<'_, SpanState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
