use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::config::validation::parse_backend_url;
use crate::lifecycle::startup::http_backend;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::pool::PoolError;

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendStatus {
    pub url: String,
    pub alive: bool,
}

impl From<&Backend> for BackendStatus {
    fn from(backend: &Backend) -> Self {
        Self {
            url: backend.url().to_string(),
            alive: backend.is_alive(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BackendRequest {
    pub url: String,
}

pub async fn list_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    Json(
        state
            .pool
            .backends()
            .iter()
            .map(|b| BackendStatus::from(b.as_ref()))
            .collect(),
    )
}

pub async fn add_backend(
    State(state): State<AdminState>,
    Json(body): Json<BackendRequest>,
) -> Result<(StatusCode, Json<BackendStatus>), (StatusCode, String)> {
    let backend = http_backend(&body.url, &state.client)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let status = BackendStatus::from(backend.as_ref());

    match state.pool.add_backend(backend) {
        Ok(()) => Ok((StatusCode::CREATED, Json(status))),
        Err(e @ PoolError::Duplicate(_)) => Err((StatusCode::CONFLICT, e.to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

pub async fn remove_backend(
    State(state): State<AdminState>,
    Json(body): Json<BackendRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let url = parse_backend_url(&body.url).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    match state.pool.remove_backend(&url) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err((StatusCode::NOT_FOUND, format!("backend {} not found", url))),
    }
}
