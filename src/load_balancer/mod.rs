//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request buffered
//!     → pool.rs (snapshot of the backend list)
//!     → round_robin.rs (rotate, skipping dead backends)
//!     → backend.rs (liveness flag + forwarder)
//!     → forwarder.rs (transport seam; HTTP impl lives in http::upstream)
//!     → Return backend or PoolError
//! ```
//!
//! # Design Decisions
//! - The backend list is swapped atomically; selection never locks it
//! - Liveness is per backend and visible to the next selection immediately
//! - Health sweeps probe every backend concurrently

pub mod backend;
pub mod forwarder;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use forwarder::{ForwardError, Forwarder};
pub use pool::{PoolError, ServerPool};
pub use round_robin::RoundRobin;
