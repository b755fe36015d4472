//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aloha::http::{instrument, AppError, RequestFailure};
use aloha::reporter::memory::InMemoryReporter;
use aloha::tracer::{SharedTracer, ZipkinTracer};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::mpsc;

/// Zipkin tracer reporting into memory.
pub fn memory_tracer() -> (SharedTracer, InMemoryReporter) {
    let reporter = InMemoryReporter::new();
    let tracer: SharedTracer = Arc::new(ZipkinTracer::new(Arc::new(reporter.clone())));
    (tracer, reporter)
}

/// Instrumented router with the service endpoints plus failing ones.
pub fn test_router(tracer: SharedTracer) -> Router {
    let routes = Router::new()
        .route("/api/aloha", get(aloha::http::handlers::aloha))
        .route("/api/health", get(aloha::http::handlers::health))
        .route("/fail", get(failing_handler).post(failing_handler))
        .route("/panic", get(panicking_handler))
        .route("/bad-gateway", get(bad_gateway_handler));
    instrument(routes, tracer)
}

async fn failing_handler() -> Result<String, AppError> {
    Err(AppError::internal("database unreachable"))
}

async fn panicking_handler() -> String {
    panic!("handler exploded")
}

async fn bad_gateway_handler() -> Response {
    RequestFailure::from_status(StatusCode::BAD_GATEWAY)
        .attach(StatusCode::BAD_GATEWAY.into_response())
}

/// Serve `router` on an ephemeral port.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Mock Zipkin collector; each POSTed batch is forwarded on the channel.
pub async fn start_zipkin_collector() -> (String, mpsc::UnboundedReceiver<serde_json::Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let router = Router::new().route(
        "/api/v1/spans",
        post(move |Json(batch): Json<serde_json::Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(batch);
                StatusCode::ACCEPTED
            }
        }),
    );
    let addr = spawn_server(router).await;
    (format!("http://{}", addr), rx)
}

/// Mock Zipkin collector that never answers its first POST.
pub async fn start_stalling_zipkin_collector(
) -> (String, mpsc::UnboundedReceiver<serde_json::Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let posts = Arc::new(AtomicUsize::new(0));
    let router = Router::new().route(
        "/api/v1/spans",
        post(move |Json(batch): Json<serde_json::Value>| {
            let tx = tx.clone();
            let posts = posts.clone();
            async move {
                if posts.fetch_add(1, Ordering::SeqCst) == 0 {
                    std::future::pending::<()>().await;
                }
                let _ = tx.send(batch);
                StatusCode::ACCEPTED
            }
        }),
    );
    let addr = spawn_server(router).await;
    (format!("http://{}", addr), rx)
}

/// Mock Jaeger agent; each datagram is forwarded on the channel.
pub async fn start_jaeger_agent() -> (String, mpsc::UnboundedReceiver<Vec<u8>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 65_535];
        while let Ok(len) = socket.recv(&mut buf).await {
            if tx.send(buf[..len].to_vec()).is_err() {
                break;
            }
        }
    });
    (addr.to_string(), rx)
}

/// Next message on `rx`, or `None` after `wait`.
pub async fn recv_within<T>(rx: &mut mpsc::UnboundedReceiver<T>, wait: Duration) -> Option<T> {
    tokio::time::timeout(wait, rx.recv()).await.ok().flatten()
}

pub fn contains_bytes(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}
