//! Failure middleware.
//!
//! Runs inside the request middleware. When the response carries a
//! [`RequestFailure`], the active span gets `error=true` and, if the failure
//! has an error object, an `error` event log. The span is not finished here;
//! that stays with the response body.

use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::http::error::RequestFailure;
use crate::http::middleware::ActiveSpan;
use crate::tracer::{tags, Span};

pub async fn trace_failure(req: Request<Body>, next: Next) -> Response {
    let active = ActiveSpan::from_extensions(req.extensions()).cloned();
    let response = next.run(req).await;

    if let Some(failure) = response.extensions().get::<RequestFailure>() {
        match &active {
            Some(active) => record_failure(active.span(), failure),
            None => tracing::debug!(status = %failure.status, "Request failed without an active span"),
        }
    }

    response
}

/// Mark `span` as failed.
pub fn record_failure(span: &Span, failure: &RequestFailure) {
    span.set_tag(tags::ERROR, true);
    if let Some(error) = &failure.error {
        span.log([
            (tags::EVENT, tags::ERROR.to_string()),
            (tags::ERROR_OBJECT, error.to_string()),
        ]);
    }
}
