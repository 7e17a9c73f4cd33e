//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active sweep (active.rs):
//!     Fixed timer (20s)
//!     → ServerPool::health_sweep
//!     → one task per backend: TCP probe (2s timeout) → mark_alive
//!
//! Passive demotion (routing::router):
//!     Backend fails a request 1 + 3 times
//!     → ServerPool::mark_alive(url, false)
//! ```
//!
//! # Design Decisions
//! - Liveness is a plain alive/dead flag, no hysteresis
//! - A dead backend only comes back through a successful probe
//! - Probe failures are logged, never surfaced to clients

pub mod active;
