//! Request middleware.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → HeaderExtractor → Tracer::extract (parent, if any)
//!     → server span named after the method, tagged kind/method/url
//!     → ActiveSpan in request extensions
//!     → next handler
//!     → TracedBody (sets http.status_code, finishes at body end)
//! ```
//!
//! If the handler future is dropped before producing a response the span
//! is finished without a status code.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::http::body::TracedBody;
use crate::http::middleware::ActiveSpan;
use crate::tracer::{tags, HeaderExtractor, SharedTracer, Span, TracerExt};

pub async fn trace_request(
    State(tracer): State<SharedTracer>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let parent = tracer.extract(&HeaderExtractor::new(req.headers()));
    let method = req.method().as_str().to_ascii_uppercase();
    let url = absolute_uri(&req);

    let span = tracer
        .build_span(&method)
        .child_of(parent)
        .with_tag(tags::SPAN_KIND, tags::SPAN_KIND_SERVER)
        .with_tag(tags::HTTP_METHOD, method.as_str())
        .with_tag(tags::HTTP_URL, url)
        .start();

    req.extensions_mut().insert(ActiveSpan::new(span.clone()));

    let pending = PendingSpan(Some(span));
    let response = next.run(req).await;
    let span = pending.disarm();

    let status = response.status().as_u16();
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(TracedBody::new(body, span, status)))
}

/// Absolute URL of the request as seen by this server.
///
/// The host comes from the URI authority, else the `Host` header.
pub fn absolute_uri<B>(req: &Request<B>) -> String {
    let uri = req.uri();
    let scheme = uri.scheme_str().unwrap_or("http");
    let host = uri
        .authority()
        .map(|authority| authority.as_str())
        .or_else(|| req.headers().get(header::HOST)?.to_str().ok())
        .unwrap_or("");
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("{}://{}{}", scheme, host, path_and_query)
}

/// Finishes the span if the request future is dropped mid-flight.
struct PendingSpan(Option<Span>);

impl PendingSpan {
    fn disarm(mut self) -> Span {
        self.0.take().unwrap_or_else(Span::noop)
    }
}

impl Drop for PendingSpan {
    fn drop(&mut self) {
        if let Some(span) = self.0.take() {
            tracing::debug!("Request dropped before a response was produced");
            span.finish();
        }
    }
}
