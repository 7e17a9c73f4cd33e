//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn the validated backend list into a `ServerPool`
//! - Share one upstream client across every backend's forwarder
//!
//! # Design Decisions
//! - Fail fast: any invalid backend is fatal
//! - Backends start alive; the first sweep runs one interval later

use std::sync::Arc;
use std::time::Duration;

use crate::config::validation::{parse_backend_url, ValidationError};
use crate::config::ProxyConfig;
use crate::http::upstream::{build_client, HttpForwarder, UpstreamClient};
use crate::load_balancer::backend::Backend;
use crate::load_balancer::forwarder::ForwardError;
use crate::load_balancer::pool::{PoolError, ServerPool};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Please provide one or more backends to load balance")]
    NoBackends,

    #[error(transparent)]
    InvalidBackend(#[from] ValidationError),

    #[error("cannot forward to backend: {0}")]
    Forwarder(#[from] ForwardError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Build a backend that forwards over HTTP through `client`.
pub fn http_backend(raw: &str, client: &UpstreamClient) -> Result<Arc<Backend>, StartupError> {
    let url = parse_backend_url(raw)?;
    let forwarder = HttpForwarder::new(&url, client.clone())?;
    Ok(Arc::new(Backend::new(url, Arc::new(forwarder))))
}

/// Build the backend pool described by `config`.
pub fn build_pool(config: &ProxyConfig) -> Result<ServerPool, StartupError> {
    if config.backends.is_empty() {
        return Err(StartupError::NoBackends);
    }

    let client = build_client(Duration::from_secs(config.timeouts.connect_secs));
    let pool = ServerPool::new(Vec::with_capacity(config.backends.len()));
    for raw in &config.backends {
        pool.add_backend(http_backend(raw, &client)?)?;
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(backends: &[&str]) -> ProxyConfig {
        ProxyConfig {
            backends: backends.iter().map(|s| s.to_string()).collect(),
            ..ProxyConfig::default()
        }
    }

    #[tokio::test]
    async fn test_build_pool_in_order() {
        let pool = build_pool(&config_with(&["http://127.0.0.1:3001", "http://127.0.0.1:3002"])).unwrap();
        let ports: Vec<_> = pool.backends().iter().map(|b| b.url().port()).collect();
        assert_eq!(ports, vec![Some(3001), Some(3002)]);
        assert_eq!(pool.live_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_list_is_fatal() {
        assert!(matches!(build_pool(&config_with(&[])), Err(StartupError::NoBackends)));
    }

    #[tokio::test]
    async fn test_invalid_token_is_fatal() {
        let err = build_pool(&config_with(&["http://127.0.0.1:3001", "::nope::"])).unwrap_err();
        assert!(matches!(err, StartupError::InvalidBackend(_)));
    }

    #[tokio::test]
    async fn test_duplicate_token_is_fatal() {
        let err = build_pool(&config_with(&["http://127.0.0.1:3001", "http://127.0.0.1:3001/"])).unwrap_err();
        assert!(matches!(err, StartupError::Pool(PoolError::Duplicate(_))));
    }
}
