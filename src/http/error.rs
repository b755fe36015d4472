//! Request failures as seen by the tracing middleware.
//!
//! Handlers return [`AppError`]; its response carries a [`RequestFailure`]
//! extension that the failure middleware turns into span error data.
//! Panics caught by `CatchPanicLayer` are mapped the same way.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("handler panicked: {0}")]
    Panic(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let mut response = (status, self.to_string()).into_response();
        response
            .extensions_mut()
            .insert(RequestFailure::from_error(status, self));
        response
    }
}

/// Marker on a response whose request failed.
#[derive(Clone)]
pub struct RequestFailure {
    pub status: StatusCode,
    pub error: Option<Arc<dyn StdError + Send + Sync>>,
}

impl RequestFailure {
    /// Failure with only a status; the span gets the error tag but no log.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status,
            error: None,
        }
    }

    pub fn from_error<E>(status: StatusCode, error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            status,
            error: Some(Arc::new(error)),
        }
    }

    /// Attach this marker to `response`.
    pub fn attach(self, mut response: Response) -> Response {
        response.extensions_mut().insert(self);
        response
    }
}

impl fmt::Debug for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestFailure")
            .field("status", &self.status)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .finish()
    }
}

/// Response for a panicking handler, installed through `CatchPanicLayer::custom`.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %message, "Request handler panicked");
    AppError::Panic(message).into_response()
}
