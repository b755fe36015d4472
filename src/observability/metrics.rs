//! Span delivery metrics.
//!
//! # Metrics
//! - `aloha_spans_reported_total` (counter): spans accepted by the backend
//! - `aloha_spans_dropped_total` (counter): spans dropped because the queue was full
//! - `aloha_span_flush_failures_total` (counter): spans in batches that failed to send
//!
//! Every counter carries a `backend` label.
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade only; no exporter is installed,
//!   so without a recorder these are no-ops

use metrics::counter;

pub const SPANS_REPORTED: &str = "aloha_spans_reported_total";
pub const SPANS_DROPPED: &str = "aloha_spans_dropped_total";
pub const FLUSH_FAILURES: &str = "aloha_span_flush_failures_total";

pub fn record_spans_reported(backend: &'static str, count: usize) {
    counter!(SPANS_REPORTED, "backend" => backend).increment(count as u64);
}

pub fn record_spans_dropped(backend: &'static str, count: usize) {
    counter!(SPANS_DROPPED, "backend" => backend).increment(count as u64);
}

pub fn record_flush_failure(backend: &'static str, count: usize) {
    counter!(FLUSH_FAILURES, "backend" => backend).increment(count as u64);
}
