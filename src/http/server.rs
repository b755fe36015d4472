//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the endpoint handlers
//! - Wire up middleware (request timeout, tracing, access logs)
//! - Bind server to listener and drain on shutdown

use std::io;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AlohaConfig;
use crate::http::error::panic_response;
use crate::http::handlers;
use crate::http::middleware::{trace_failure, trace_request};
use crate::lifecycle::Shutdown;
use crate::tracer::SharedTracer;

/// HTTP server for the aloha service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and tracer.
    pub fn new(config: AlohaConfig, tracer: SharedTracer) -> Self {
        Self {
            router: build_router(&config, tracer),
        }
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(Shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &AlohaConfig, tracer: SharedTracer) -> Router {
    let routes = Router::new()
        .route("/api/aloha", get(handlers::aloha))
        .route("/api/health", get(handlers::health))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.timeouts.request_secs,
        )));

    instrument(routes, tracer).layer(TraceLayer::new_for_http())
}

/// Install the tracing middleware around every route of `router`,
/// including its fallback.
///
/// Call once per router; nesting instrumented routers starts one span per
/// layer.
pub fn instrument(router: Router, tracer: SharedTracer) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(trace_failure))
        .layer(middleware::from_fn_with_state(tracer, trace_request))
}
