use anyhow::Result;

use super::{build_app, Command};
use crate::config::QuotedeskConfig;
use crate::services::seed;

pub struct SeedCommand {
    pub config: QuotedeskConfig,
}

impl Command for SeedCommand {
    async fn execute(&self) -> Result<()> {
        if self.config.database.is_none() {
            println!("No database configured; seeding an in-memory store has no lasting effect.");
        }
        let app = build_app(self.config.clone()).await?;
        let report = seed::run(&app).await?;

        println!("Permissions:   {}", report.permissions);
        println!("Roles created: {}", report.roles_created);
        println!("Roles updated: {}", report.roles_updated);
        if report.admin_created {
            println!("Bootstrap admin created: {}", self.config.auth.bootstrap_admin_email);
        } else {
            println!("Bootstrap admin unchanged");
        }
        crate::database::shutdown_database().await;
        Ok(())
    }
}
