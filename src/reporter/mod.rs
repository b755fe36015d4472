//! Span reporting subsystem.
//!
//! # Data Flow
//! ```text
//! Span::finish
//!     → Reporter::report (non-blocking, never fails)
//!     → BufferedReporter queue (bounded mpsc)
//!     → background task batches by size or flush interval
//!     → SpanSender::send
//!         → zipkin.rs (HTTP POST, JSON v1)
//!         → jaeger.rs (UDP, Thrift compact emitBatch)
//! ```
//!
//! # Design Decisions
//! - Reporting is fire-and-forget: a full queue drops the span
//! - Delivery errors are logged and counted, never surfaced to requests
//! - Every send is bounded by `send_timeout`; a stalled backend costs one
//!   batch, not the reporter
//! - Metrics go through the `metrics` facade; with no recorder installed
//!   they are discarded

pub mod jaeger;
pub mod memory;
pub mod zipkin;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::time::MissedTickBehavior;

use crate::observability::metrics;
use crate::tracer::FinishedSpan;

/// Sink for finished spans.
pub trait Reporter: Send + Sync {
    fn report(&self, span: FinishedSpan);

    /// Flush what is buffered and stop accepting spans.
    fn close(&self) {}
}

/// Errors raised while delivering spans to a backend.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("no tokio runtime available to run the reporter")]
    NoRuntime,

    #[error("HTTP delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("UDP delivery failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("span encoding failed: {0}")]
    Encode(String),

    #[error("span of {size} bytes exceeds max packet size {max}")]
    SpanTooLarge { size: usize, max: usize },

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Delivers one batch of spans to a backend.
pub trait SpanSender: Send + 'static {
    fn send(
        &mut self,
        batch: Vec<FinishedSpan>,
    ) -> impl Future<Output = Result<(), ReporterError>> + Send;
}

/// Queue tuning for [`BufferedReporter`].
#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    /// Spans held before new ones are dropped.
    pub queue_size: usize,
    /// Maximum time a span waits before its batch is sent.
    pub flush_interval: Duration,
    /// Spans per batch that trigger an early flush.
    pub max_batch_spans: usize,
    /// Upper bound on a single batch delivery.
    pub send_timeout: Duration,
    /// Upper bound on opening a collector connection.
    pub connect_timeout: Duration,
}

/// Reporter that buffers spans and ships them from a background task.
pub struct BufferedReporter {
    backend: &'static str,
    tx: mpsc::Sender<FinishedSpan>,
    closed: Arc<Notify>,
}

impl BufferedReporter {
    /// Spawn the flush task on the current Tokio runtime.
    pub fn spawn<S: SpanSender>(
        backend: &'static str,
        sender: S,
        settings: QueueSettings,
    ) -> Result<Self, ReporterError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| ReporterError::NoRuntime)?;

        let (tx, rx) = mpsc::channel(settings.queue_size.max(1));
        let closed = Arc::new(Notify::new());

        handle.spawn(run_flush_loop(backend, sender, rx, settings, closed.clone()));

        tracing::debug!(
            backend,
            queue_size = settings.queue_size,
            flush_interval_ms = settings.flush_interval.as_millis() as u64,
            "Span reporter started"
        );

        Ok(Self { backend, tx, closed })
    }
}

impl Reporter for BufferedReporter {
    fn report(&self, span: FinishedSpan) {
        match self.tx.try_send(span) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(span)) => {
                tracing::warn!(
                    backend = self.backend,
                    span_id = %span.context.span_id,
                    "Span queue full, dropping span"
                );
                metrics::record_spans_dropped(self.backend, 1);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                metrics::record_spans_dropped(self.backend, 1);
            }
        }
    }

    fn close(&self) {
        self.closed.notify_one();
    }
}

async fn run_flush_loop<S: SpanSender>(
    backend: &'static str,
    mut sender: S,
    mut rx: mpsc::Receiver<FinishedSpan>,
    settings: QueueSettings,
    closed: Arc<Notify>,
) {
    let period = settings.flush_interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: Vec<FinishedSpan> = Vec::new();

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(span) => {
                    pending.push(span);
                    if pending.len() >= settings.max_batch_spans.max(1) {
                        flush(backend, &mut sender, &mut pending, settings.send_timeout).await;
                    }
                }
                None => {
                    flush(backend, &mut sender, &mut pending, settings.send_timeout).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                flush(backend, &mut sender, &mut pending, settings.send_timeout).await;
            }
            _ = closed.notified() => {
                rx.close();
                while let Some(span) = rx.recv().await {
                    pending.push(span);
                }
                flush(backend, &mut sender, &mut pending, settings.send_timeout).await;
                break;
            }
        }
    }

    tracing::debug!(backend, "Span reporter stopped");
}

async fn flush<S: SpanSender>(
    backend: &'static str,
    sender: &mut S,
    pending: &mut Vec<FinishedSpan>,
    send_timeout: Duration,
) {
    if pending.is_empty() {
        return;
    }

    let batch = std::mem::take(pending);
    let count = batch.len();
    let result = tokio::time::timeout(send_timeout, sender.send(batch))
        .await
        .unwrap_or(Err(ReporterError::Timeout(send_timeout)));
    match result {
        Ok(()) => {
            tracing::trace!(backend, spans = count, "Flushed spans");
            metrics::record_spans_reported(backend, count);
        }
        Err(e) => {
            tracing::warn!(backend, spans = count, error = %e, "Failed to flush spans");
            metrics::record_flush_failure(backend, count);
        }
    }
}
