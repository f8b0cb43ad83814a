//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (trace chain, CORS, timeouts)
//! - Expose the metrics and healthcheck endpoints
//! - Spawn the span exporter and serve until shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use crate::config::schema::CorsConfig;
use crate::config::GatewayConfig;
use crate::http::forward::{self, UpstreamSet};
use crate::http::middleware::trace_requests;
use crate::observability::export::{BatchSpanExporter, ExportQueue};
use crate::observability::metrics;
use crate::observability::span::SpanRecorder;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub upstreams: Arc<UpstreamSet>,
    pub client: reqwest::Client,
    pub recorder: SpanRecorder,
    pub metrics: Option<PrometheusHandle>,
}

/// Errors that prevent the gateway from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid upstream url: {0}")]
    UpstreamUrl(#[from] url::ParseError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    queue: Arc<ExportQueue>,
    client: reqwest::Client,
}

impl HttpServer {
    /// Create a new server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let upstreams = Arc::new(UpstreamSet::from_config(&config.upstreams)?);

        // One client for upstream calls and span export. Redirects are not
        // followed; the gateway passes them through to the caller.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()?;

        let queue = Arc::new(ExportQueue::new(
            config.tracing.queue_capacity,
            config.tracing.batch_size,
        ));
        let recorder = SpanRecorder::new(Arc::clone(&queue), config.tracing.enabled);

        let metrics_handle = if config.metrics.enabled {
            Some(metrics::install(&config.metrics.buckets)?)
        } else {
            None
        };

        let state = AppState {
            config: Arc::new(config.clone()),
            upstreams,
            client: client.clone(),
            recorder,
            metrics: metrics_handle,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            queue,
            client,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        // The trace chain wraps only the API surface; /metrics stays
        // untraced so scrapes never touch the export queue.
        let api = Router::new()
            .route("/api/openai/{*path}", any(forward::openai))
            .route("/api/cohere/{*path}", any(forward::cohere))
            .route("/api/healthcheck", get(healthcheck))
            .layer(from_fn_with_state(state.clone(), trace_requests));

        Router::new()
            .merge(api)
            .route("/metrics", get(metrics_snapshot))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    )))
                    .layer(cors_layer(&config.cors)),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.tracing.enabled {
            let exporter = BatchSpanExporter::new(
                Arc::clone(&self.queue),
                self.client.clone(),
                &self.config.tracing,
            );
            exporter.spawn(shutdown.resubscribe());
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Mirrored methods/headers stay compatible with credentialed requests,
    // where wildcards are forbidden.
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(config.allow_credentials)
}

/// Liveness endpoint.
async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "llm-gateway is healthy" }))
}

/// Prometheus exposition endpoint. Always 200; reads only recorder state.
async fn metrics_snapshot(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::OK.into_response(),
    }
}
