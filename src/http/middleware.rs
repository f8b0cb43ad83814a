//! Request middleware chain.
//!
//! # Responsibilities
//! Orchestrate the observability pipeline around every request, in order:
//! 1. decode the propagation header, or mint a fresh trace context
//! 2. start the request span
//! 3. stash the context in request extensions for outbound propagation
//! 4. enter the correlation log span and invoke the handler
//! 5. finalize the span with the outcome
//! 6. record the metric sample
//!
//! Steps 5 and 6 live inside the span guard, so they run exactly once even
//! if the handler faults or the request is cancelled mid-flight.
//!
//! # Design Decisions
//! - Explicit middleware, no framework auto-instrumentation: the whole
//!   chain is visible here and testable in isolation
//! - The inbound header's span id becomes the parent of this request's
//!   span; the request itself runs under a derived child context

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

use crate::http::server::AppState;
use crate::observability::logging;
use crate::observability::propagation::{self, TraceContext};

pub async fn trace_requests(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header_name = &state.config.tracing.propagation_header;
    let (ctx, parent_span_id) = match propagation::extract(request.headers(), header_name) {
        Some(remote) => (remote.child(), Some(remote.span_id)),
        None => (TraceContext::generate(), None),
    };

    // Metrics group by route template, not raw path, so /api/openai/a and
    // /api/openai/b share a label. Unmatched requests fall back to the path.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let method = request.method().clone();

    let mut span = state.recorder.start(&ctx, parent_span_id, &route);
    span.set_attribute("http.method", method.as_str().into());
    span.set_attribute("http.target", request.uri().path().into());
    request.extensions_mut().insert(ctx);

    let response = next
        .run(request)
        .instrument(logging::request_span(&ctx, &method, &route))
        .await;

    span.finish(response.status().as_u16());
    response
}
