//! Trace context propagation.
//!
//! # Responsibilities
//! - Decode trace context from the inbound propagation header
//! - Encode trace context onto outbound upstream requests
//! - Mint fresh contexts when no valid header arrives
//!
//! # Wire Format
//! A single header value `{trace_id}:{span_id}:{flag}` where `trace_id` is
//! 32 lowercase hex chars, `span_id` is 16 lowercase hex chars, and `flag`
//! is `1` (sampled) or `0`. All-zero ids are invalid. Anything malformed is
//! treated as absent.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use rand::Rng;

/// Immutable trace context carried by one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceContext {
    /// 128-bit identifier shared by every span in the trace.
    pub trace_id: u128,

    /// 64-bit identifier of the current span.
    pub span_id: u64,

    /// Whether spans of this trace are retained for export.
    pub sampled: bool,
}

impl TraceContext {
    /// Mint a fresh root context with random non-zero ids, sampled.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            trace_id: nonzero_u128(&mut rng),
            span_id: nonzero_u64(&mut rng),
            sampled: true,
        }
    }

    /// Derive a child context: same trace, fresh span id.
    pub fn child(&self) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            trace_id: self.trace_id,
            span_id: nonzero_u64(&mut rng),
            sampled: self.sampled,
        }
    }

    /// Decode a propagation header value. Returns `None` for anything that
    /// is not exactly the wire format above.
    pub fn decode(value: &str) -> Option<Self> {
        let mut fields = value.split(':');
        let trace_id = parse_fixed_hex(fields.next()?, 32)?;
        let span_id = parse_fixed_hex(fields.next()?, 16)?;
        let sampled = match fields.next()? {
            "1" => true,
            "0" => false,
            _ => return None,
        };
        if fields.next().is_some() || trace_id == 0 || span_id == 0 {
            return None;
        }
        Some(Self {
            trace_id: trace_id as u128,
            span_id: span_id as u64,
            sampled,
        })
    }

    /// Encode this context as a propagation header value. Inverse of
    /// [`TraceContext::decode`] for well-formed input.
    pub fn encode(&self) -> String {
        format!(
            "{}:{}:{}",
            format_trace_id(self.trace_id),
            format_span_id(self.span_id),
            u8::from(self.sampled)
        )
    }
}

/// Render a trace id the way it appears on the wire and in logs.
pub fn format_trace_id(trace_id: u128) -> String {
    format!("{trace_id:032x}")
}

/// Render a span id the way it appears on the wire and in logs.
pub fn format_span_id(span_id: u64) -> String {
    format!("{span_id:016x}")
}

/// Decode the configured propagation header from a request's headers.
pub fn extract(headers: &HeaderMap, header_name: &str) -> Option<TraceContext> {
    let value = headers.get(header_name)?.to_str().ok()?;
    TraceContext::decode(value)
}

/// Write the propagation header for a downstream call. A header name or
/// value that cannot be represented is skipped rather than failing the call.
pub fn inject(ctx: &TraceContext, headers: &mut HeaderMap, header_name: &str) {
    let Ok(name) = HeaderName::try_from(header_name) else {
        return;
    };
    let Ok(value) = HeaderValue::from_str(&ctx.encode()) else {
        return;
    };
    headers.insert(name, value);
}

fn parse_fixed_hex(field: &str, width: usize) -> Option<u128> {
    if field.len() != width || !field.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return None;
    }
    u128::from_str_radix(field, 16).ok()
}

fn nonzero_u128(rng: &mut impl Rng) -> u128 {
    loop {
        let id: u128 = rng.gen();
        if id != 0 {
            return id;
        }
    }
}

fn nonzero_u64(rng: &mut impl Rng) -> u64 {
    loop {
        let id: u64 = rng.gen();
        if id != 0 {
            return id;
        }
    }
}
