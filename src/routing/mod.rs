//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Buffered request
//!     → router.rs ROUTING: attempts exhausted? → 503
//!     → ServerPool::select_next → none live? → 503
//!     → DISPATCHED: backend.forward
//!         ok   → response
//!         fail → RetryContext decides RETRY_SAME or REROUTE
//! ```
//!
//! # Design Decisions
//! - One router shared by all request tasks; per-request state stays local
//! - Explicit typed states instead of counters threaded through side channels

pub mod router;

pub use router::{RouteError, Router};
