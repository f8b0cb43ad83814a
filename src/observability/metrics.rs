//! Metrics collection and exposition.
//!
//! # Metrics
//! - `llm_gateway_requests_total` (counter): requests by route and status
//! - `llm_gateway_request_duration_seconds` (histogram): latency by route
//! - `llm_gateway_spans_dropped_total` (counter): spans evicted from the
//!   export queue
//!
//! # Design Decisions
//! - One process-wide Prometheus recorder, installed at startup; repeat
//!   installs hand back the existing handle
//! - Histogram buckets come from config (geometric spacing from 10ms to
//!   120s by default)
//! - Updates are lock-free atomics, safe under concurrent requests

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "llm_gateway_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "llm_gateway_request_duration_seconds";
pub const SPANS_DROPPED_TOTAL: &str = "llm_gateway_spans_dropped_total";

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static INSTALL: Mutex<()> = Mutex::new(());

/// Install the process-wide Prometheus recorder with the given latency
/// buckets. Idempotent: later calls return the handle from the first
/// install (the recorder is global, so buckets from the first call win).
pub fn install(buckets: &[f64]) -> Result<PrometheusHandle, BuildError> {
    let _guard = INSTALL.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(handle) = HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION_SECONDS.to_string()), buckets)?
        .install_recorder()?;
    Ok(HANDLE.get_or_init(|| handle).clone())
}

/// Record one finished request: a count labeled by route and status, and a
/// latency observation labeled by route.
pub fn record_request(route: &str, status: u16, duration: Duration) {
    debug_assert!(!route.is_empty(), "metric samples require a route label");

    counter!(
        REQUESTS_TOTAL,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "route" => route.to_string())
        .record(duration.as_secs_f64());
}
