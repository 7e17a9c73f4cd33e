//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, request ID, request timeout)
//! - Buffer each request and hand it to the load balancer
//! - Spawn the health monitor alongside the server
//! - Graceful shutdown on the shared shutdown signal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::HeaderName,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::health::active::HealthMonitor;
use crate::http::request::{ProxyRequest, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::load_balancer::pool::ServerPool;
use crate::routing::Router as ProxyRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ProxyRouter>,
    pub max_body_bytes: usize,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<ServerPool>,
}

impl HttpServer {
    /// Create a new HTTP server balancing over `pool`.
    pub fn new(config: ProxyConfig, pool: Arc<ServerPool>) -> Self {
        let proxy_router = Arc::new(ProxyRouter::new(pool.clone()));
        Self::with_router(config, proxy_router)
    }

    /// Create a server around an existing load-balancing router.
    pub fn with_router(config: ProxyConfig, proxy_router: Arc<ProxyRouter>) -> Self {
        let pool = proxy_router.pool().clone();
        let state = AppState {
            router: proxy_router,
            max_body_bytes: config.listener.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self { router, config, pool }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// The router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "Load balancer started"
        );

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(self.pool.clone(), self.config.health_check.clone());
            let monitor_shutdown = shutdown.subscribe();
            tokio::spawn(async move {
                monitor.run(monitor_shutdown).await;
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut server_shutdown = shutdown.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler: buffer the request, then load balance it.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let request = match ProxyRequest::buffer(request, state.max_body_bytes).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(method = %method, path = %path, error = %e, "Rejected request");
            return e.into_response();
        }
    };

    tracing::debug!(
        request_id = %request.request_id(),
        method = %method,
        path = %path,
        "Proxying request"
    );

    match state.router.route(&request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::tests::backend;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_dead_pool_returns_503_with_request_id() {
        let b = backend("http://127.0.0.1:9001");
        b.set_alive(false);
        let pool = Arc::new(ServerPool::new(vec![b]));
        let server = HttpServer::new(ProxyConfig::default(), pool);

        let response = server
            .router()
            .oneshot(axum::http::Request::builder().uri("/anything").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let pool = Arc::new(ServerPool::new(vec![backend("http://127.0.0.1:9001")]));
        let mut config = ProxyConfig::default();
        config.listener.max_body_bytes = 8;
        let server = HttpServer::new(config, pool);

        let response = server
            .router()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .body(Body::from("definitely more than eight bytes"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
