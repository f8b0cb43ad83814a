//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check upstream URLs parse and use http(s)
//! - Validate value ranges (timeouts > 0, batch sizes sane)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, UpstreamConfig};

/// A single semantic error found in a configuration.
#[derive(Debug, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

fn err(field: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        message: message.into(),
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(err(
            "listener.bind_address",
            format!("not a valid socket address: {}", config.listener.bind_address),
        ));
    }

    check_upstream(&config.upstreams.openai, "upstreams.openai.base_url", &mut errors);
    check_upstream(&config.upstreams.cohere, "upstreams.cohere.base_url", &mut errors);

    if config.timeouts.request_secs == 0 {
        errors.push(err("timeouts.request_secs", "must be greater than zero"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(err("timeouts.connect_secs", "must be greater than zero"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(err("limits.max_body_bytes", "must be greater than zero"));
    }
    if config.retries.max_attempts == 0 {
        errors.push(err("retries.max_attempts", "must be at least 1"));
    }

    if config.tracing.batch_size == 0 {
        errors.push(err("tracing.batch_size", "must be at least 1"));
    }
    if config.tracing.queue_capacity < config.tracing.batch_size {
        errors.push(err(
            "tracing.queue_capacity",
            "must be at least tracing.batch_size",
        ));
    }
    if config.tracing.export_interval_ms == 0 {
        errors.push(err("tracing.export_interval_ms", "must be greater than zero"));
    }
    if config.tracing.propagation_header.is_empty() {
        errors.push(err("tracing.propagation_header", "must not be empty"));
    }
    if config.tracing.enabled && Url::parse(&config.tracing.collector_endpoint).is_err() {
        errors.push(err(
            "tracing.collector_endpoint",
            format!("not a valid URL: {}", config.tracing.collector_endpoint),
        ));
    }

    if config.metrics.buckets.is_empty() {
        errors.push(err("metrics.buckets", "must define at least one bucket"));
    }
    if !config.metrics.buckets.windows(2).all(|w| w[0] < w[1]) {
        errors.push(err("metrics.buckets", "must be strictly ascending"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_upstream(upstream: &UpstreamConfig, field: &'static str, errors: &mut Vec<ValidationError>) {
    match Url::parse(&upstream.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(err(field, format!("unsupported scheme: {}", url.scheme()))),
        Err(parse_err) => errors.push(err(field, format!("not a valid URL: {parse_err}"))),
    }
}
