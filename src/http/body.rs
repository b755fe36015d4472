//! Response body that finishes the server span when it ends.
//!
//! The span gets `http.status_code` and is finished at the first of:
//! - the inner body reporting its last frame or end of stream
//! - the inner body returning an error
//! - the body being dropped before it ended (client went away)

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use http_body::{Frame, SizeHint};

use crate::tracer::{tags, Span};

pub struct TracedBody {
    inner: Body,
    span: Option<Span>,
    status: u16,
}

impl TracedBody {
    pub fn new(inner: Body, span: Span, status: u16) -> Self {
        Self {
            inner,
            span: Some(span),
            status,
        }
    }

    fn finish(&mut self) {
        if let Some(span) = self.span.take() {
            span.set_tag(tags::HTTP_STATUS_CODE, self.status);
            span.finish();
        }
    }
}

impl http_body::Body for TracedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) | Poll::Ready(Some(Err(_))) => this.finish(),
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => this.finish(),
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for TracedBody {
    fn drop(&mut self) {
        if self.span.is_some() {
            tracing::trace!("Response body dropped before end of stream");
        }
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::memory::InMemoryReporter;
    use crate::tracer::{TagValue, TracerExt, ZipkinTracer};
    use http_body_util::BodyExt;
    use std::sync::Arc;

    fn tracer(reporter: &InMemoryReporter) -> ZipkinTracer {
        ZipkinTracer::new(Arc::new(reporter.clone()))
    }

    #[tokio::test]
    async fn test_finishes_at_end_of_stream() {
        let reporter = InMemoryReporter::new();
        let span = tracer(&reporter).build_span("GET").start();
        let body = TracedBody::new(Body::from("Aloha"), span.clone(), 200);

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Aloha");
        assert!(span.is_finished());

        let spans = reporter.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].tag("http.status_code"), Some(&TagValue::I64(200)));
    }

    #[tokio::test]
    async fn test_drop_before_end_finishes_once() {
        let reporter = InMemoryReporter::new();
        let span = tracer(&reporter).build_span("GET").start();
        let body = TracedBody::new(Body::from("never read"), span.clone(), 503);

        drop(body);
        assert!(span.is_finished());
        assert!(!span.finish());

        let spans = reporter.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].tag("http.status_code"), Some(&TagValue::I64(503)));
    }
}
