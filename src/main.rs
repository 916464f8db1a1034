use anyhow::Result;
use clap::Parser;

use quotedesk::cli::commands::config::{InitConfigCommand, ShowConfigCommand};
use quotedesk::cli::commands::seed::SeedCommand;
use quotedesk::cli::commands::serve::ServeCommand;
use quotedesk::cli::commands::{show_usage, Command};
use quotedesk::cli::{Cli, Commands, ConfigAction};
use quotedesk::config::QuotedeskConfig;
use quotedesk::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => tokio::runtime::Runtime::new()?.block_on(async { show_usage().await }),
        Some(Commands::Serve { bind, no_seed }) => {
            let config = load_config()?;
            init_telemetry(&config.observability)?;
            tokio::runtime::Runtime::new()?.block_on(async {
                ServeCommand {
                    config,
                    bind,
                    seed: !no_seed,
                }
                .execute()
                .await
            })
        }
        Some(Commands::Seed) => {
            let config = load_config()?;
            init_telemetry(&config.observability)?;
            tokio::runtime::Runtime::new()?
                .block_on(async { SeedCommand { config }.execute().await })
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => {
                let config = load_config()?;
                tokio::runtime::Runtime::new()?
                    .block_on(async { ShowConfigCommand { config }.execute().await })
            }
            ConfigAction::Init { path, force } => tokio::runtime::Runtime::new()?
                .block_on(async { InitConfigCommand { path, force }.execute().await }),
        },
    }
}

fn load_config() -> Result<QuotedeskConfig> {
    QuotedeskConfig::load_env_file()?;
    QuotedeskConfig::load()
}
