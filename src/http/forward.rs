//! Upstream request forwarding.
//!
//! # Responsibilities
//! - Buffer the request body under the configured limit
//! - Rewrite the URL onto the upstream base
//! - Copy headers minus hop-by-hop ones, inject the propagation header
//! - Stream the upstream response back to the client
//!
//! # Design Decisions
//! - No provider-specific translation: bytes in, bytes out
//! - Only idempotent methods are retried, and only on transport errors;
//!   upstream status codes pass through untouched
//! - Upstream failures map to 502, oversized bodies to 413

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use url::Url;

use crate::config::schema::UpstreamsConfig;
use crate::http::server::AppState;
use crate::observability::propagation::{self, TraceContext};
use crate::resilience::retries::retry;

/// Headers that must not be forwarded in either direction.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// One configured upstream provider.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub name: &'static str,
    pub route_prefix: &'static str,
    pub base_url: Url,
}

/// The providers the gateway fronts, resolved from config at startup.
#[derive(Debug, Clone)]
pub struct UpstreamSet {
    pub openai: Upstream,
    pub cohere: Upstream,
}

impl UpstreamSet {
    pub fn from_config(config: &UpstreamsConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            openai: Upstream {
                name: "openai",
                route_prefix: "/api/openai",
                base_url: Url::parse(&config.openai.base_url)?,
            },
            cohere: Upstream {
                name: "cohere",
                route_prefix: "/api/cohere",
                base_url: Url::parse(&config.cohere.base_url)?,
            },
        })
    }
}

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to buffer request body: {0}")]
    Body(axum::Error),

    #[error("upstream call failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("failed to assemble response: {0}")]
    Http(#[from] axum::http::Error),
}

pub async fn openai(State(state): State<AppState>, request: Request) -> Response {
    let upstream = state.upstreams.openai.clone();
    forward(state, upstream, request).await
}

pub async fn cohere(State(state): State<AppState>, request: Request) -> Response {
    let upstream = state.upstreams.cohere.clone();
    forward(state, upstream, request).await
}

async fn forward(state: AppState, upstream: Upstream, request: Request) -> Response {
    match proxy(&state, &upstream, request).await {
        Ok(response) => response,
        Err(ForwardError::Body(error)) => {
            tracing::warn!(upstream = upstream.name, %error, "rejecting request body");
            (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response()
        }
        Err(error) => {
            tracing::error!(upstream = upstream.name, %error, "upstream request failed");
            (StatusCode::BAD_GATEWAY, "upstream request failed").into_response()
        }
    }
}

async fn proxy(
    state: &AppState,
    upstream: &Upstream,
    request: Request,
) -> Result<Response, ForwardError> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, state.config.limits.max_body_bytes)
        .await
        .map_err(ForwardError::Body)?;

    let url = upstream_url(&upstream.base_url, upstream.route_prefix, &parts.uri);

    let mut headers = parts.headers.clone();
    strip_hop_by_hop(&mut headers);
    if let Some(ctx) = parts.extensions.get::<TraceContext>() {
        propagation::inject(ctx, &mut headers, &state.config.tracing.propagation_header);
    }

    let method = parts.method;
    let attempt = || {
        state
            .client
            .request(method.clone(), url.clone())
            .headers(headers.clone())
            .body(body.clone())
            .send()
    };

    let upstream_response = if state.config.retries.enabled && method.is_idempotent() {
        retry(
            &state.config.retries,
            |error: &reqwest::Error| error.is_connect() || error.is_timeout(),
            attempt,
        )
        .await
    } else {
        attempt().await
    }?;

    let status = upstream_response.status();
    let mut response_headers = upstream_response.headers().clone();
    strip_hop_by_hop(&mut response_headers);

    let mut builder = axum::http::Response::builder().status(status);
    if let Some(headers_mut) = builder.headers_mut() {
        *headers_mut = response_headers;
    }
    Ok(builder.body(Body::from_stream(upstream_response.bytes_stream()))?)
}

/// Map a gateway path onto the upstream base URL, keeping the query string.
fn upstream_url(base: &Url, route_prefix: &str, uri: &Uri) -> Url {
    let tail = uri.path().strip_prefix(route_prefix).unwrap_or("");
    let mut url = base.clone();
    let path = format!("{}{}", url.path().trim_end_matches('/'), tail);
    url.set_path(&path);
    url.set_query(uri.query());
    url
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}
