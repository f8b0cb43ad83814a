//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the LLM gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream provider endpoints.
    pub upstreams: UpstreamsConfig,

    /// CORS policy for browser clients.
    pub cors: CorsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitConfig,

    /// Retry configuration for idempotent upstream calls.
    pub retries: RetryConfig,

    /// Distributed tracing settings.
    pub tracing: TracingConfig,

    /// Metrics exposition settings.
    pub metrics: MetricsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// The set of upstream providers the gateway fronts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamsConfig {
    /// OpenAI-compatible upstream, served under `/api/openai`.
    pub openai: UpstreamConfig,

    /// Cohere-compatible upstream, served under `/api/cohere`.
    pub cohere: UpstreamConfig,
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            openai: UpstreamConfig {
                base_url: "https://api.openai.com".to_string(),
            },
            cohere: UpstreamConfig {
                base_url: "https://api.cohere.ai".to_string(),
            },
        }
    }
}

/// A single upstream provider endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to (scheme + authority + optional
    /// path prefix).
    pub base_url: String,
}

/// CORS policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the gateway from a browser.
    pub allowed_origins: Vec<String>,

    /// Whether credentialed requests are allowed.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: true,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// End-to-end request timeout in seconds. Model calls are slow, so the
    /// default is generous.
    pub request_secs: u64,

    /// Connect timeout for upstream calls in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 120,
            connect_secs: 10,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Maximum buffered request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Retry configuration for idempotent upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries for idempotent requests.
    pub enabled: bool,

    /// Maximum total attempts per request (first try included).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Cap on the backoff delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

/// Distributed tracing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Enable span export. Context propagation and log correlation stay on
    /// regardless.
    pub enabled: bool,

    /// Service name attached to every exported batch.
    pub service_name: String,

    /// HTTP endpoint of the trace collector.
    pub collector_endpoint: String,

    /// Name of the propagation header carrying trace context.
    pub propagation_header: String,

    /// Maximum spans shipped per export call.
    pub batch_size: usize,

    /// Export interval in milliseconds; a batch is shipped when this elapses
    /// or `batch_size` spans are queued, whichever comes first.
    pub export_interval_ms: u64,

    /// Capacity of the span queue. Oldest spans are dropped on overflow.
    pub queue_capacity: usize,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "llm_gateway".to_string(),
            collector_endpoint: "http://127.0.0.1:14268/api/traces".to_string(),
            propagation_header: "x-trace-context".to_string(),
            batch_size: 64,
            export_interval_ms: 5_000,
            queue_capacity: 2_048,
        }
    }
}

/// Metrics exposition settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus recorder and the `/metrics` route.
    pub enabled: bool,

    /// Latency histogram bucket boundaries in seconds, ascending.
    pub buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buckets: vec![
                0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
                60.0, 120.0,
            ],
        }
    }
}
