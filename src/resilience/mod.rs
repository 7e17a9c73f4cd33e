//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch to backend fails:
//!     → retries.rs RetryContext::record_failure
//!         retry_count < 3  → RetrySame (sleep 10ms, same backend)
//!         retry_count >= 3 → Reroute (demote backend, select again)
//!     → attempt_count > 3 → request exhausted (503)
//! ```
//!
//! # Design Decisions
//! - Transient failures never reach the client
//! - A backend that fails a single request repeatedly is demoted pool-wide
//! - Total work per request is bounded regardless of pool size

pub mod retries;

pub use retries::{FailureAction, RetryContext, RetryPolicy};
