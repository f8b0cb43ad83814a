//! Per-request span recording.
//!
//! # Responsibilities
//! - Start one span per request and stamp wall-clock bounds on it
//! - Finalize the span exactly once on every exit path
//! - Hand closed spans to the export queue and emit the metric sample
//!
//! # Design Decisions
//! - Finalization is tied to `Drop`, so cancelled and panicking requests
//!   still reach the queue with the right status
//! - A second `finish` is a no-op; the span has already left the guard
//! - Unsampled spans skip export but still produce metric samples

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

use crate::observability::export::ExportQueue;
use crate::observability::metrics;
use crate::observability::propagation::{format_span_id, format_trace_id, TraceContext};

/// Synthetic status code recorded when the client goes away before the
/// handler completes (nginx convention).
pub const STATUS_CLIENT_CLOSED: u16 = 499;

/// Outcome of a traced unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Ok,
    Error,
    Cancelled,
}

/// One closed, immutable unit of traced work.
#[derive(Debug, Clone, Serialize)]
pub struct Span {
    #[serde(serialize_with = "hex_trace_id")]
    pub trace_id: u128,

    #[serde(serialize_with = "hex_span_id")]
    pub span_id: u64,

    #[serde(serialize_with = "hex_parent_span_id", skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<u64>,

    /// Route template the request matched.
    pub name: String,

    pub start_time_unix_nanos: u64,
    pub end_time_unix_nanos: u64,

    pub status: SpanStatus,

    /// Free-form attributes; insertion order is irrelevant.
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Creates a [`SpanGuard`] per request, wired to the shared export queue.
#[derive(Clone)]
pub struct SpanRecorder {
    queue: Arc<ExportQueue>,
    export_enabled: bool,
}

impl SpanRecorder {
    pub fn new(queue: Arc<ExportQueue>, export_enabled: bool) -> Self {
        Self {
            queue,
            export_enabled,
        }
    }

    /// Open a span for a request. The returned guard finalizes the span on
    /// `finish`, or on drop if the request never completes normally.
    pub fn start(&self, ctx: &TraceContext, parent_span_id: Option<u64>, name: &str) -> SpanGuard {
        SpanGuard {
            span: Some(Span {
                trace_id: ctx.trace_id,
                span_id: ctx.span_id,
                parent_span_id,
                name: name.to_string(),
                start_time_unix_nanos: unix_nanos_now(),
                end_time_unix_nanos: 0,
                status: SpanStatus::Ok,
                attributes: BTreeMap::new(),
            }),
            started: Instant::now(),
            sampled: ctx.sampled && self.export_enabled,
            queue: Arc::clone(&self.queue),
        }
    }
}

/// Scoped handle to an open span. Exactly one finalization happens per
/// guard, whether through [`SpanGuard::finish`] or drop.
pub struct SpanGuard {
    span: Option<Span>,
    started: Instant,
    sampled: bool,
    queue: Arc<ExportQueue>,
}

impl SpanGuard {
    /// Attach an attribute to the span. No-op after finalization.
    pub fn set_attribute(&mut self, key: &str, value: serde_json::Value) {
        if let Some(span) = &mut self.span {
            span.attributes.insert(key.to_string(), value);
        }
    }

    /// Finalize with the response status. 5xx counts as a fault; everything
    /// else, including 4xx, is a completed request.
    pub fn finish(&mut self, status_code: u16) {
        let status = if status_code >= 500 {
            SpanStatus::Error
        } else {
            SpanStatus::Ok
        };
        self.complete(status, status_code);
    }

    fn complete(&mut self, status: SpanStatus, status_code: u16) {
        let Some(mut span) = self.span.take() else {
            return;
        };
        span.end_time_unix_nanos = unix_nanos_now();
        span.status = status;
        span.attributes
            .insert("http.status_code".to_string(), status_code.into());

        let route = span.name.clone();
        if self.sampled {
            self.queue.enqueue(span);
        }
        metrics::record_request(&route, status_code, self.started.elapsed());
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if self.span.is_none() {
            return;
        }
        if std::thread::panicking() {
            self.complete(SpanStatus::Error, 500);
        } else {
            // The future was dropped before the response was produced:
            // client disconnect or an outer timeout cancelling the request.
            self.complete(SpanStatus::Cancelled, STATUS_CLIENT_CLOSED);
        }
    }
}

fn unix_nanos_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn hex_trace_id<S: Serializer>(id: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_trace_id(*id))
}

fn hex_span_id<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_span_id(*id))
}

fn hex_parent_span_id<S: Serializer>(id: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match id {
        Some(id) => serializer.serialize_str(&format_span_id(*id)),
        None => serializer.serialize_none(),
    }
}
