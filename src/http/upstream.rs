//! HTTP forwarding to a single upstream.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the target (base path joined, query kept)
//! - Set `Host` to the target and strip hop-by-hop headers
//! - Send through the shared upstream client
//!
//! # Design Decisions
//! - One client (and its connection pool) shared by every backend
//! - Only transport errors are failures; upstream status codes pass through

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{
    header,
    uri::{Authority, PathAndQuery, Scheme},
    HeaderMap, HeaderName, HeaderValue, Request, Response, Uri, Version,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::load_balancer::forwarder::{ForwardError, Forwarder};

/// Client type shared by all forwarders.
pub type UpstreamClient = Client<HttpConnector, Body>;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Build the shared upstream client.
pub fn build_client(connect_timeout: Duration) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Forwards requests to one fixed backend URL.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    authority: Authority,
    base_path: String,
    client: UpstreamClient,
}

impl HttpForwarder {
    pub fn new(target: &Url, client: UpstreamClient) -> Result<Self, ForwardError> {
        let host = target
            .host_str()
            .ok_or_else(|| ForwardError::InvalidRequest(format!("{} has no host", target)))?;
        let authority = match target.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = authority
            .parse::<Authority>()
            .map_err(|e| ForwardError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            authority,
            base_path: target.path().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn target_uri(&self, original: &Uri) -> Result<Uri, ForwardError> {
        let path = original.path();
        let joined = match original.query() {
            Some(query) => format!("{}{}?{}", self.base_path, path, query),
            None => format!("{}{}", self.base_path, path),
        };
        let path_and_query = joined
            .parse::<PathAndQuery>()
            .map_err(|e| ForwardError::InvalidRequest(e.to_string()))?;

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| ForwardError::InvalidRequest(e.to_string()))
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by `Connection` are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, mut request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        *request.uri_mut() = self.target_uri(request.uri())?;
        // The upstream connection is always HTTP/1.1, whatever the client spoke.
        *request.version_mut() = Version::HTTP_11;

        let headers = request.headers_mut();
        strip_hop_by_hop(headers);
        let host = HeaderValue::from_str(self.authority.as_str())
            .map_err(|e| ForwardError::InvalidRequest(e.to_string()))?;
        headers.insert(header::HOST, host);

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ForwardError::Transport(e.to_string()))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
