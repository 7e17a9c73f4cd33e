//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered backend list (configuration order)
//! - Select the next live backend (round-robin over the live subset)
//! - Mark backends alive/dead by URL
//! - Administrative add/remove
//! - Fan out one probe task per backend on each health sweep
//!
//! # Design Decisions
//! - Backend list lives behind `ArcSwap`: selection never takes a lock and
//!   add/remove publish a fresh copy
//! - Only the per-backend liveness flag is locked; the cursor is atomic

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use url::Url;

use crate::load_balancer::{backend::Backend, round_robin::RoundRobin};

/// Pool selection and edit failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Selection on a pool with no backends at all.
    #[error("backend pool is empty")]
    Empty,

    #[error("no live backend in pool")]
    NoLiveBackend,

    #[error("backend {0} already in pool")]
    Duplicate(Url),
}

/// The shared set of backends and its round-robin cursor.
#[derive(Debug)]
pub struct ServerPool {
    backends: ArcSwap<Vec<Arc<Backend>>>,
    selector: RoundRobin,
}

impl ServerPool {
    /// Create a pool from backends in rotation order.
    pub fn new(backends: Vec<Arc<Backend>>) -> Self {
        Self {
            backends: ArcSwap::from_pointee(backends),
            selector: RoundRobin::new(),
        }
    }

    /// Select the next live backend.
    pub fn select_next(&self) -> Result<Arc<Backend>, PoolError> {
        let backends = self.backends.load();
        if backends.is_empty() {
            tracing::error!("Backend selection attempted on an empty pool");
            return Err(PoolError::Empty);
        }

        match self.selector.next_live(&backends) {
            Some(backend) => Ok(backend),
            None => {
                tracing::debug!(backend_count = backends.len(), "No live backend found in pool");
                Err(PoolError::NoLiveBackend)
            }
        }
    }

    /// Set liveness for the backend with the given URL.
    ///
    /// Returns false if no such backend is in the pool.
    pub fn mark_alive(&self, url: &Url, alive: bool) -> bool {
        let backends = self.backends.load();
        let Some(backend) = backends.iter().find(|b| b.url() == url) else {
            tracing::debug!(backend = %url, "Liveness update for unknown backend");
            return false;
        };

        let was_alive = backend.set_alive(alive);
        if was_alive != alive {
            let status = if alive { "up" } else { "down" };
            tracing::info!(backend = %url, status, "Backend liveness changed");
        }
        true
    }

    /// Append a backend to the rotation.
    pub fn add_backend(&self, backend: Arc<Backend>) -> Result<(), PoolError> {
        let mut duplicate = false;
        self.backends.rcu(|current| {
            duplicate = current.iter().any(|b| b.url() == backend.url());
            if duplicate {
                return Arc::clone(current);
            }
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(backend.clone());
            Arc::new(next)
        });

        if duplicate {
            return Err(PoolError::Duplicate(backend.url().clone()));
        }
        tracing::info!(backend = %backend.url(), "Added backend to the pool");
        Ok(())
    }

    /// Remove the backend with the given URL, returning it.
    pub fn remove_backend(&self, url: &Url) -> Option<Arc<Backend>> {
        let mut removed = None;
        self.backends.rcu(|current| {
            removed = current.iter().find(|b| b.url() == url).cloned();
            if removed.is_none() {
                return Arc::clone(current);
            }
            Arc::new(current.iter().filter(|b| b.url() != url).cloned().collect::<Vec<_>>())
        });

        match &removed {
            Some(_) => tracing::info!(backend = %url, "Removed backend from the pool"),
            None => tracing::warn!(backend = %url, "Backend not found"),
        }
        removed
    }

    /// Probe every backend concurrently and record the results.
    ///
    /// Each backend gets its own task, so a hanging probe only holds up its
    /// own backend. The caller is not expected to await the returned handles.
    pub fn health_sweep(self: &Arc<Self>, timeout: Duration) -> Vec<JoinHandle<()>> {
        let backends = self.backends.load_full();
        tracing::debug!(backend_count = backends.len(), "Checking the health of the backends");

        backends
            .iter()
            .cloned()
            .map(|backend| {
                let pool = Arc::clone(self);
                tokio::spawn(async move {
                    let alive = backend.probe(timeout).await;
                    pool.mark_alive(backend.url(), alive);
                })
            })
            .collect()
    }

    /// Snapshot of the current backends, in rotation order.
    pub fn backends(&self) -> Vec<Arc<Backend>> {
        self.backends.load().iter().cloned().collect()
    }

    pub fn live_count(&self) -> usize {
        self.backends.load().iter().filter(|b| b.is_alive()).count()
    }

    pub fn len(&self) -> usize {
        self.backends.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.load().is_empty()
    }
}
