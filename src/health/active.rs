//! Active health checking.
//!
//! # Responsibilities
//! - Trigger a pool-wide health sweep on a fixed interval
//! - Stop when the shutdown signal fires

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::load_balancer::pool::ServerPool;

pub struct HealthMonitor {
    pool: Arc<ServerPool>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ServerPool>, config: HealthCheckConfig) -> Self {
        Self { pool, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        let interval = self.config.interval();
        tracing::info!(
            interval_secs = self.config.interval_secs,
            timeout_secs = self.config.timeout_secs,
            "Health monitor starting"
        );

        // First sweep after one full period; backends start alive.
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Sweep tasks are detached; a slow probe never delays the next tick.
                    let _ = self.pool.health_sweep(self.config.timeout());
                    tracing::debug!(
                        live = self.pool.live_count(),
                        total = self.pool.len(),
                        "Health sweep dispatched"
                    );
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
