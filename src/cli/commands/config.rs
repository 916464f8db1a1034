use std::path::Path;

use anyhow::{bail, Result};

use super::Command;
use crate::config::QuotedeskConfig;

pub struct ShowConfigCommand {
    pub config: QuotedeskConfig,
}

impl Command for ShowConfigCommand {
    async fn execute(&self) -> Result<()> {
        print!("{}", render_redacted(&self.config)?);
        Ok(())
    }
}

pub struct InitConfigCommand {
    pub path: String,
    pub force: bool,
}

impl Command for InitConfigCommand {
    async fn execute(&self) -> Result<()> {
        if Path::new(&self.path).exists() && !self.force {
            bail!("{} already exists (use --force to overwrite)", self.path);
        }
        QuotedeskConfig::default().save_to_file(&self.path)?;
        println!("Wrote default configuration to {}", self.path);
        Ok(())
    }
}

fn render_redacted(config: &QuotedeskConfig) -> Result<String> {
    let mut config = config.clone();
    if config.auth.bootstrap_admin_password.is_some() {
        config.auth.bootstrap_admin_password = Some("********".to_string());
    }
    Ok(toml::to_string_pretty(&config)?)
}
