//! Request routing and failover.
//!
//! # Responsibilities
//! - Select a live backend for each request
//! - Dispatch and react to forwarding failures
//! - Surface pool exhaustion as a single uniform error
//!
//! # Design Decisions
//! - The retry delay is awaited inside the request future: dropping the
//!   request (client gone, timeout layer) abandons the retry with it
//! - Demotion goes through the pool, so every later selection sees it

use std::sync::Arc;

use axum::body::Body;
use axum::http::Response;
use tokio::time;

use crate::http::request::ProxyRequest;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::pool::ServerPool;
use crate::resilience::{FailureAction, RetryContext, RetryPolicy};

/// The only failure a caller ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("service unavailable")]
    ServiceUnavailable,
}

/// Where a request currently is in the failover state machine.
#[derive(Debug)]
enum State {
    /// Choose a backend (or give up).
    Routing,
    /// Send to the chosen backend.
    Dispatched(Arc<Backend>),
}

/// Load-balancing entry point shared by all request tasks.
#[derive(Debug)]
pub struct Router {
    pool: Arc<ServerPool>,
    policy: RetryPolicy,
}

impl Router {
    pub fn new(pool: Arc<ServerPool>) -> Self {
        Self::with_policy(pool, RetryPolicy::default())
    }

    pub fn with_policy(pool: Arc<ServerPool>, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// Route one request through the pool, retrying and failing over as needed.
    pub async fn route(&self, request: &ProxyRequest) -> Result<Response<Body>, RouteError> {
        let request_id = request.request_id();
        let mut ctx = RetryContext::new();
        let mut state = State::Routing;

        loop {
            state = match state {
                State::Routing => {
                    if ctx.is_exhausted(&self.policy) {
                        tracing::warn!(
                            request_id = %request_id,
                            attempts = ctx.attempt_count(),
                            "Attempts exhausted, service not available"
                        );
                        return Err(RouteError::ServiceUnavailable);
                    }

                    match self.pool.select_next() {
                        Ok(backend) => State::Dispatched(backend),
                        Err(e) => {
                            tracing::warn!(request_id = %request_id, error = %e, "Service not available");
                            return Err(RouteError::ServiceUnavailable);
                        }
                    }
                }
                State::Dispatched(backend) => {
                    let err = match backend.forward(request.to_request()).await {
                        Ok(response) => return Ok(response),
                        Err(e) => e,
                    };

                    tracing::warn!(
                        request_id = %request_id,
                        backend = %backend.url(),
                        error = %err,
                        "Forwarding failed"
                    );

                    match ctx.record_failure(&self.policy) {
                        FailureAction::RetrySame { delay } => {
                            tracing::debug!(
                                request_id = %request_id,
                                backend = %backend.url(),
                                retry = ctx.retry_count(),
                                delay = ?delay,
                                "Retrying same backend"
                            );
                            time::sleep(delay).await;
                            State::Dispatched(backend)
                        }
                        FailureAction::Reroute => {
                            self.pool.mark_alive(backend.url(), false);
                            tracing::info!(
                                request_id = %request_id,
                                backend = %backend.url(),
                                attempt = ctx.attempt_count(),
                                "Backend demoted, rerouting"
                            );
                            State::Routing
                        }
                    }
                }
            };
        }
    }
}
