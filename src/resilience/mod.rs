//! Resilience subsystem.
//!
//! # Design Decisions
//! - Retries are a combinator over any fallible async operation, driven by
//!   a policy (max attempts, retryable-error predicate)
//! - Only transport-level failures of idempotent requests are retried
//! - Jittered backoff prevents thundering herds

pub mod backoff;
pub mod retries;
