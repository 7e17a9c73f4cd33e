//! Runtime administration API.
//!
//! # Endpoints
//! ```text
//! GET    /admin/backends            → list backends with liveness
//! POST   /admin/backends {"url"}    → add a backend (starts alive)
//! DELETE /admin/backends {"url"}    → remove a backend
//! ```
//!
//! Every endpoint requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;

use self::auth::admin_auth_middleware;
use self::handlers::{add_backend, list_backends, remove_backend};
use crate::config::ProxyConfig;
use crate::http::upstream::{build_client, UpstreamClient};
use crate::lifecycle::Shutdown;
use crate::load_balancer::pool::ServerPool;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub pool: Arc<ServerPool>,
    pub api_key: Arc<str>,
    pub client: UpstreamClient,
}

impl AdminState {
    pub fn new(pool: Arc<ServerPool>, config: &ProxyConfig) -> Self {
        Self {
            pool,
            api_key: Arc::from(config.admin.api_key.as_str()),
            client: build_client(Duration::from_secs(config.timeouts.connect_secs)),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route(
            "/admin/backends",
            get(list_backends).post(add_backend).delete(remove_backend),
        )
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin API until `shutdown` fires.
pub async fn serve(listener: TcpListener, state: AdminState, shutdown: Shutdown) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");
    let mut rx = shutdown.subscribe();

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = rx.recv().await;
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::tests::backend;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const KEY: &str = "secret";

    fn admin(backends: &[&str]) -> (Arc<ServerPool>, Router) {
        let pool = Arc::new(ServerPool::new(backends.iter().map(|b| backend(b)).collect()));
        let mut config = ProxyConfig::default();
        config.admin.api_key = KEY.to_string();
        let router = setup_admin_router(AdminState::new(pool.clone(), &config));
        (pool, router)
    }

    fn request(method: &str, body: Option<&str>, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri("/admin/backends");
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_rejects_missing_or_wrong_key() {
        let (_, router) = admin(&["http://127.0.0.1:3001"]);

        let response = router.clone().oneshot(request("GET", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router.oneshot(request("GET", None, Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_reports_liveness() {
        let (pool, router) = admin(&["http://127.0.0.1:3001", "http://127.0.0.1:3002"]);
        pool.backends()[1].set_alive(false);

        let response = router.oneshot(request("GET", None, Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let listed: Vec<handlers::BackendStatus> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].alive);
        assert!(!listed[1].alive);
        assert_eq!(listed[1].url, "http://127.0.0.1:3002/");
    }

    #[tokio::test]
    async fn test_add_then_conflict() {
        let (pool, router) = admin(&["http://127.0.0.1:3001"]);
        let body = r#"{"url":"http://127.0.0.1:3002"}"#;

        let response = router.clone().oneshot(request("POST", Some(body), Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.live_count(), 2);

        let response = router.oneshot(request("POST", Some(body), Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn test_add_invalid_url() {
        let (pool, router) = admin(&["http://127.0.0.1:3001"]);

        let response = router
            .oneshot(request("POST", Some(r#"{"url":"ftp://example.com"}"#), Some(KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let (pool, router) = admin(&["http://127.0.0.1:3001", "http://127.0.0.1:3002"]);
        let body = r#"{"url":"http://127.0.0.1:3001"}"#;

        let response = router.clone().oneshot(request("DELETE", Some(body), Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(pool.len(), 1);

        let response = router.oneshot(request("DELETE", Some(body), Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
