//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, routes, CORS, timeouts)
//!     → middleware.rs (trace context, span, log correlation, metrics)
//!     → forward.rs (buffer body, rewrite URL, inject trace header,
//!       forward to the upstream provider)
//!     → Send response to client
//! ```

pub mod forward;
pub mod middleware;
pub mod server;

pub use server::HttpServer;
