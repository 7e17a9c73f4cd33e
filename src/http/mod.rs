//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → request.rs (buffer body, add X-Forwarded-For)
//!     → [routing::Router picks and retries backends]
//!     → upstream.rs (rewrite URI, strip hop-by-hop, send)
//!     → response.rs (503 / 413 / 400 for local failures)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::{ProxyRequest, X_REQUEST_ID};
pub use server::HttpServer;
