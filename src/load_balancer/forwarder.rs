//! Forwarding capability.
//!
//! A [`Forwarder`] delivers one request to one fixed target and reports either
//! the upstream response or a transport failure. The failover engine never
//! looks inside: it only reacts to `Ok` or `Err`.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};

/// Transport-level failure while talking to a backend.
///
/// Any HTTP status returned by the backend, 5xx included, is a successful
/// forward and never a `ForwardError`.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),

    #[error("upstream transport error: {0}")]
    Transport(String),
}

/// Delivers requests to a single upstream target.
#[async_trait]
pub trait Forwarder: Send + Sync + std::fmt::Debug {
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError>;
}
