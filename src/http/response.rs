//! Response handling.
//!
//! # Responsibilities
//! - Map routing and request errors to HTTP responses
//!
//! # Design Decisions
//! - Pool exhaustion is a uniform 503; clients never learn which backend
//!   failed or why

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::request::RequestError;
use crate::routing::RouteError;

/// Body sent with every 503.
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Service not available at the moment";

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        match self {
            RouteError::ServiceUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, SERVICE_UNAVAILABLE_MESSAGE).into_response()
            }
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = match self {
            RequestError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::Body(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}
