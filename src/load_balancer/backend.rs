//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track liveness (alive / not alive)
//! - Actively probe the backend with a bounded TCP connect
//! - Hand requests to the backend's forwarder

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use tokio::net::TcpStream;
use tokio::time;
use url::Url;

use crate::load_balancer::forwarder::{ForwardError, Forwarder};

/// A single backend server.
pub struct Backend {
    /// Target URL; unique within a pool.
    url: Url,
    /// `host:port` used for probing.
    probe_addr: String,
    /// Last-known liveness. Read on every selection scan.
    alive: RwLock<bool>,
    forwarder: Arc<dyn Forwarder>,
}

impl Backend {
    /// Create a new backend. Backends start alive.
    pub fn new(url: Url, forwarder: Arc<dyn Forwarder>) -> Self {
        let host = url.host_str().unwrap_or_default();
        let port = url.port_or_known_default().unwrap_or(80);
        let probe_addr = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };

        Self {
            url,
            probe_addr,
            alive: RwLock::new(true),
            forwarder,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn probe_addr(&self) -> &str {
        &self.probe_addr
    }

    /// Last-known liveness. Never performs I/O.
    pub fn is_alive(&self) -> bool {
        // A panic while holding the lock cannot leave a bool half-written.
        *self.alive.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Update liveness, returning the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        let mut guard = self.alive.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, alive)
    }

    /// Actively check liveness with a TCP connect bounded by `timeout`.
    ///
    /// The probe connection is dropped before returning, whatever the outcome.
    /// Blocks on the network: only the health sweep calls this.
    pub async fn probe(&self, timeout: Duration) -> bool {
        match time::timeout(timeout, TcpStream::connect(&self.probe_addr)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::warn!(backend = %self.url, error = %e, "Backend is down");
                false
            }
            Err(_) => {
                tracing::warn!(backend = %self.url, timeout = ?timeout, "Backend is down: probe timed out");
                false
            }
        }
    }

    /// Dispatch a request through this backend's forwarder.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        self.forwarder.forward(request).await
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("url", &self.url.as_str())
            .field("alive", &self.is_alive())
            .finish()
    }
}
