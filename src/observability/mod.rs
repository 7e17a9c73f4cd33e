//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!
//! Request correlation:
//!     → tower-http request-id layers stamp `x-request-id`
//!     → router logs carry it on every failover decision
//! ```

pub mod logging;

pub use logging::init_logging;
