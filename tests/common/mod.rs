//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use failover_proxy::lifecycle::startup::build_pool;
use failover_proxy::{HttpServer, ProxyConfig, ServerPool, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A mock backend answering every request with its name.
#[allow(dead_code)]
pub struct MockBackend {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Stop accepting connections; later connects are refused.
    pub fn kill(&self) {
        self.handle.abort();
    }
}

/// Start a mock backend on an ephemeral port.
///
/// The body is `name`; the `x-seen-path` header echoes the request target.
pub async fn start_mock_backend(name: &'static str) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let handle = tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let counter = counter.clone();
            tokio::spawn(async move {
                let _ = respond(socket, name, &counter).await;
            });
        }
    });

    MockBackend { addr, hits, handle }
}

async fn respond(mut socket: TcpStream, name: &str, hits: &AtomicUsize) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            // Health probes connect and close without sending a request.
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    hits.fetch_add(1, Ordering::SeqCst);

    let head = String::from_utf8_lossy(&buf);
    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nx-seen-path: {}\r\nConnection: close\r\n\r\n{}",
        name.len(),
        target,
        name
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Config for a proxy in front of `backends`, health sweeps disabled.
pub fn proxy_config(backends: &[String]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.backends = backends.to_vec();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.health_check.enabled = false;
    config
}

/// A running load balancer.
#[allow(dead_code)]
pub struct TestProxy {
    pub addr: SocketAddr,
    pub pool: Arc<ServerPool>,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the load balancer on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let pool = Arc::new(build_pool(&config).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(config, pool.clone());
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        server.run(listener, server_shutdown).await.unwrap();
    });

    TestProxy { addr, pool, shutdown }
}
