//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts, queue sizes, flush intervals > 0)
//! - Check the bind address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AlohaConfig → Result<(), Vec<ValidationError>>
//! - Tracing URLs are not validated; a bad URL shows up at flush time

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AlohaConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &AlohaConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let reporter = &config.reporter;
    let positive = [
        ("reporter.zipkin_queue_size", reporter.zipkin_queue_size as u64),
        ("reporter.zipkin_flush_interval_ms", reporter.zipkin_flush_interval_ms),
        ("reporter.jaeger_queue_size", reporter.jaeger_queue_size as u64),
        ("reporter.jaeger_flush_interval_ms", reporter.jaeger_flush_interval_ms),
        ("reporter.max_batch_spans", reporter.max_batch_spans as u64),
        ("reporter.send_timeout_ms", reporter.send_timeout_ms),
        ("reporter.connect_timeout_ms", reporter.connect_timeout_ms),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
