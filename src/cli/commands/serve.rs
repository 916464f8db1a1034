use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{build_app, Command};
use crate::config::QuotedeskConfig;
use crate::http::build_router;
use crate::services::seed;
use crate::shutdown::ShutdownCoordinator;

pub struct ServeCommand {
    pub config: QuotedeskConfig,
    pub bind: Option<String>,
    pub seed: bool,
}

impl Command for ServeCommand {
    async fn execute(&self) -> Result<()> {
        let bind = self
            .bind
            .clone()
            .unwrap_or_else(|| self.config.server.bind.clone());
        let app = build_app(self.config.clone()).await?;

        if self.seed {
            seed::run(&app).await.context("seeding failed")?;
        } else {
            warn!("Startup seeding disabled");
        }

        let listener = TcpListener::bind(&bind)
            .await
            .with_context(|| format!("failed to bind {bind}"))?;
        info!(bind = %bind, "Quotedesk API listening");

        axum::serve(listener, build_router(app))
            .with_graceful_shutdown(ShutdownCoordinator::wait_for_signal())
            .await?;

        ShutdownCoordinator::new().shutdown_all_services().await
    }
}
