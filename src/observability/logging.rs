//! Structured logging and trace correlation.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Bind the active trace context to every request-scoped log record
//!
//! # Design Decisions
//! - Correlation is a per-request `tracing` span, not a patched global
//!   logger, so concurrent requests cannot contaminate each other
//! - Logs emitted outside a request (startup, exporter) simply carry no
//!   trace id

use axum::http::Method;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::observability::propagation::{format_span_id, format_trace_id, TraceContext};

/// Initialize the global subscriber: env-filtered, formatted to stdout.
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llm_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// The span every log record during a request is correlated under. Entering
/// it attaches `trace_id` and `span_id` fields to all nested records.
pub fn request_span(ctx: &TraceContext, method: &Method, route: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        trace_id = %format_trace_id(ctx.trace_id),
        span_id = %format_span_id(ctx.span_id),
        method = %method,
        route = route,
    )
}
