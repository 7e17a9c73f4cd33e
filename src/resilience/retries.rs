//! Retry logic.
//!
//! # Responsibilities
//! - Count same-backend retries and cross-backend attempts per request
//! - Decide, on each forwarding failure, between a delayed retry on the same
//!   backend and demote-and-reroute
//! - Bound total work per request
//!
//! # Design Decisions
//! - Counters live in a per-request `RetryContext`, never shared
//! - `retry_count` resets exactly when the request re-routes
//! - Fixed delay between same-backend retries (no jitter, no growth)

use std::time::Duration;

/// Thresholds for the failover state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries on one backend before it is demoted.
    pub max_same_backend_retries: u32,
    /// Re-routes allowed before the request is abandoned.
    pub max_attempts: u32,
    /// Pause before each same-backend retry.
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub const MAX_SAME_BACKEND_RETRIES: u32 = 3;
    pub const MAX_ATTEMPTS: u32 = 3;
    pub const RETRY_DELAY: Duration = Duration::from_millis(10);
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_same_backend_retries: Self::MAX_SAME_BACKEND_RETRIES,
            max_attempts: Self::MAX_ATTEMPTS,
            retry_delay: Self::RETRY_DELAY,
        }
    }
}

/// What to do after the current backend failed a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Wait, then send the request to the same backend again.
    RetrySame { delay: Duration },
    /// Demote the backend and select another one.
    Reroute,
}

/// Per-request retry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryContext {
    retry_count: u32,
    attempt_count: u32,
}

impl RetryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries on the current backend since the last re-route.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Backends abandoned so far for this request.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// True once the request has re-routed more than `max_attempts` times.
    pub fn is_exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempt_count > policy.max_attempts
    }

    /// Record a forwarding failure on the current backend.
    pub fn record_failure(&mut self, policy: &RetryPolicy) -> FailureAction {
        if self.retry_count < policy.max_same_backend_retries {
            self.retry_count += 1;
            FailureAction::RetrySame {
                delay: policy.retry_delay,
            }
        } else {
            self.attempt_count += 1;
            self.retry_count = 0;
            FailureAction::Reroute
        }
    }
}
