//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────▶ http::server (request ID, timeout, buffer body)
//!                     │
//!                     ▼
//!                 routing::Router ──── retry same backend (3x, 10ms apart)
//!                     │                 mark dead + reroute (3 attempts)
//!                     ▼
//!                 load_balancer::ServerPool (round robin over live backends)
//!                     │
//!                     ▼
//!                 http::upstream ──────────────────────────▶ Backend Server
//!
//!     Background:  health::active sweep every interval (TCP probe)
//!     Optional:    admin API (list / add / remove backends)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use failover_proxy::admin::{self, AdminState};
use failover_proxy::config::loader::{read_config, ConfigError};
use failover_proxy::config::validation::validate_config;
use failover_proxy::lifecycle::signals::wait_for_signal;
use failover_proxy::lifecycle::startup::{build_pool, StartupError};
use failover_proxy::observability::init_logging;
use failover_proxy::{HttpServer, ProxyConfig, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "failover-proxy")]
#[command(about = "Round-robin HTTP load balancer with health checks and failover", long_about = None)]
struct Cli {
    /// Load balanced backends, use commas to separate
    #[arg(long, value_delimiter = ',')]
    backends: Vec<String>,

    /// Port to serve on
    #[arg(long)]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ProxyConfig) {
        // Empty tokens are kept so validation rejects them.
        if !self.backends.is_empty() {
            config.backends = self.backends.into_iter().map(|b| b.trim().to_string()).collect();
        }
        if let Some(port) = self.port {
            config.listener.bind_address = format!("0.0.0.0:{port}");
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        tracing::error!(error = %e, "Load balancer failed");
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);

    init_logging(&config.observability);
    tracing::info!("failover-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if config.backends.is_empty() {
        return Err(StartupError::NoBackends.into());
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        health_interval_secs = config.health_check.interval_secs,
        "Configuration loaded"
    );

    let pool = Arc::new(build_pool(&config)?);

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => signal_shutdown.trigger(),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
        }
    });

    if config.admin.enabled {
        let addr: SocketAddr = config.admin.bind_address.parse()?;
        let listener = TcpListener::bind(addr).await?;
        let state = AdminState::new(pool.clone(), &config);
        let admin_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, admin_shutdown).await {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    HttpServer::new(config, pool).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
