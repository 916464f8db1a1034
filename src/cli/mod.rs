use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "quotedesk")]
#[command(about = "Sales pipeline and quotation approval backend")]
#[command(long_about = "Quotedesk serves the leads, opportunities, quotations and service delivery \
                       API. Start the server with 'quotedesk serve'; configuration is read from \
                       quotedesk.toml and QUOTEDESK_* environment variables.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Override the configured bind address
        #[arg(long, help = "Socket address to listen on, e.g. 0.0.0.0:8000")]
        bind: Option<String>,
        /// Skip seeding roles and the bootstrap admin at startup
        #[arg(long, help = "Do not seed permissions, roles and the bootstrap admin on startup")]
        no_seed: bool,
    },
    /// Create the permission catalog, system roles and bootstrap admin
    Seed,
    /// Inspect or create configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets redacted
    Show,
    /// Write a default configuration file
    Init {
        /// Destination file
        #[arg(long, default_value = "quotedesk.toml")]
        path: String,
        /// Overwrite an existing file
        #[arg(long, help = "Overwrite the file if it already exists")]
        force: bool,
    },
}
