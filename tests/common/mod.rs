//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;

use llm_gateway::config::GatewayConfig;
use llm_gateway::lifecycle::Shutdown;
use llm_gateway::HttpServer;

/// Propagation header used across the suite (the config default).
pub const TRACE_HEADER: &str = "x-trace-context";

/// One request observed by a mock upstream.
pub struct SeenRequest {
    pub path: String,
    pub trace_header: Option<String>,
    pub body: Vec<u8>,
}

pub type Seen = Arc<Mutex<Vec<SeenRequest>>>;

/// Start a mock upstream returning a fixed status and body, recording every
/// request it sees.
pub async fn start_mock_upstream(status: StatusCode, body: &'static str) -> (SocketAddr, Seen) {
    start_slow_upstream(status, body, Duration::ZERO).await
}

/// Same as [`start_mock_upstream`], but responses are held back by `delay`.
pub async fn start_slow_upstream(
    status: StatusCode,
    body: &'static str,
    delay: Duration,
) -> (SocketAddr, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);

    let app = Router::new().fallback(move |request: Request| {
        let recorded = Arc::clone(&recorded);
        async move {
            let path = request.uri().path().to_string();
            let trace_header = request
                .headers()
                .get(TRACE_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(String::from);
            let request_body = to_bytes(request.into_body(), 1024 * 1024)
                .await
                .unwrap_or_default();
            recorded.lock().unwrap().push(SeenRequest {
                path,
                trace_header,
                body: request_body.to_vec(),
            });
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            (status, body)
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

/// Start a mock trace collector accepting JSON span batches.
pub async fn start_collector() -> (SocketAddr, Arc<Mutex<Vec<serde_json::Value>>>) {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&spans);

    let app = Router::new().route(
        "/api/traces",
        post(move |Json(batch): Json<serde_json::Value>| {
            let sink = Arc::clone(&sink);
            async move {
                if let Some(items) = batch.get("spans").and_then(|spans| spans.as_array()) {
                    sink.lock().unwrap().extend(items.clone());
                }
                StatusCode::ACCEPTED
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, spans)
}

/// Config wired to the given mock upstreams, with fast span export when a
/// collector is supplied and tracing disabled otherwise.
pub fn gateway_config(
    openai: SocketAddr,
    cohere: SocketAddr,
    collector: Option<SocketAddr>,
) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstreams.openai.base_url = format!("http://{openai}");
    config.upstreams.cohere.base_url = format!("http://{cohere}");
    config.retries.enabled = false;
    match collector {
        Some(addr) => {
            config.tracing.collector_endpoint = format!("http://{addr}/api/traces");
            config.tracing.export_interval_ms = 100;
            config.tracing.batch_size = 128;
            config.tracing.queue_capacity = 4_096;
        }
        None => config.tracing.enabled = false,
    }
    config
}

/// Spawn a gateway on an ephemeral port. The returned `Shutdown` must stay
/// alive for the duration of the test.
pub async fn spawn_gateway(config: GatewayConfig) -> (SocketAddr, Arc<Shutdown>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(config).expect("gateway builds from test config");
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });
    (addr, shutdown)
}

/// An address nothing is listening on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    condition()
}
