use anyhow::Result;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Graceful shutdown coordinator for the API server
pub struct ShutdownCoordinator {
    drain_timeout: Duration,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            drain_timeout: Duration::from_secs(30),
        }
    }

    /// Resolves on SIGINT or SIGTERM; passed to `axum::serve(..).with_graceful_shutdown`
    pub async fn wait_for_signal() {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
            _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
        }
    }

    /// Perform post-serve cleanup
    pub async fn shutdown_all_services(&self) -> Result<()> {
        info!("Initiating graceful shutdown of all services...");

        if timeout(self.drain_timeout, crate::database::shutdown_database())
            .await
            .is_err()
        {
            warn!("Timed out closing database connections");
        }

        crate::observability::api_metrics().log_stats();
        crate::telemetry::shutdown_telemetry();

        info!("Graceful shutdown completed successfully");
        Ok(())
    }
}
