//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → propagation.rs (decode or mint trace context)
//!     → span.rs (span per request, finalized on every exit path)
//!     → export.rs (bounded queue, batched shipping to the collector)
//!     → logging.rs (trace id attached to every request-scoped log line)
//!     → metrics.rs (route/status counters, latency histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Trace collector (batched JSON over HTTP)
//! ```
//!
//! # Design Decisions
//! - The trace id appears identically in logs, metrics labels stay
//!   route-scoped, and spans carry the full context
//! - Export never touches the request path; a full queue evicts the oldest
//!   span rather than blocking
//! - Collector outages are logged and absorbed, never surfaced to callers

pub mod export;
pub mod logging;
pub mod metrics;
pub mod propagation;
pub mod span;
