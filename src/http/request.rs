//! Request handling and transformation.
//!
//! # Responsibilities
//! - Buffer the inbound body (bounded) so a request can be replayed on retry
//! - Record the client address in `X-Forwarded-For`
//! - Rebuild a fresh `Request` for every dispatch attempt
//!
//! # Design Decisions
//! - Header and URI are captured once; each attempt clones them
//! - Oversized bodies are rejected before any backend is selected

use std::net::{IpAddr, SocketAddr};

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Uri, Version};
use http_body_util::{BodyExt, LengthLimitError, Limited};

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Failure to read the inbound request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(String),
}

/// A fully buffered, replayable inbound request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl ProxyRequest {
    /// Buffer an inbound request, reading at most `limit` body bytes.
    pub async fn buffer(request: Request<Body>, limit: usize) -> Result<Self, RequestError> {
        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let (parts, body) = request.into_parts();
        let body = Limited::new(body, limit)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    RequestError::BodyTooLarge { limit }
                } else {
                    RequestError::Body(e.to_string())
                }
            })?
            .to_bytes();

        let mut headers = parts.headers;
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut headers, addr.ip());
        }

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers,
            body,
        })
    }

    #[cfg(test)]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[cfg(test)]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Correlation ID set by the request-id layer, if any.
    pub fn request_id(&self) -> &str {
        self.headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }

    /// Build a fresh request for one dispatch attempt.
    pub fn to_request(&self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        request
    }
}

#[cfg(test)]
impl From<Request<Bytes>> for ProxyRequest {
    fn from(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
        }
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffer_and_replay() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/submit?x=1")
            .header("content-type", "text/plain")
            .body(Body::from("payload"))
            .unwrap();

        let buffered = ProxyRequest::buffer(request, 1024).await.unwrap();

        for _ in 0..2 {
            let replay = buffered.to_request();
            assert_eq!(replay.method(), Method::POST);
            assert_eq!(replay.uri(), "/submit?x=1");
            assert_eq!(replay.headers()["content-type"], "text/plain");
            let body = axum::body::to_bytes(replay.into_body(), 1024).await.unwrap();
            assert_eq!(&body[..], b"payload");
        }
    }

    #[tokio::test]
    async fn test_body_limit() {
        let request = Request::builder()
            .body(Body::from(vec![0u8; 64]))
            .unwrap();

        let err = ProxyRequest::buffer(request, 16).await.unwrap_err();
        assert!(matches!(err, RequestError::BodyTooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn test_forwarded_for_appended() {
        let mut request = Request::builder()
            .header(X_FORWARDED_FOR, "10.0.0.1")
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = "192.168.1.7:5555".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        let buffered = ProxyRequest::buffer(request, 1024).await.unwrap();
        assert_eq!(buffered.headers()[X_FORWARDED_FOR], "10.0.0.1, 192.168.1.7");
    }

    #[test]
    fn test_request_id_fallback() {
        let request: ProxyRequest = Request::new(Bytes::new()).into();
        assert_eq!(request.request_id(), "unknown");
    }
}
