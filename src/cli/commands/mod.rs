use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::QuotedeskConfig;
use crate::database::init_database;
use crate::services::App;
use crate::store::MemoryDocumentStore;

pub mod config;
pub mod seed;
pub mod serve;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Open the configured store (in-memory when no database is set) and wrap it in an [`App`]
pub async fn build_app(config: QuotedeskConfig) -> Result<App> {
    let store = match init_database(&config).await? {
        Some(store) => store,
        None => {
            info!("Using in-memory document store; data is lost on exit");
            Arc::new(MemoryDocumentStore::new())
        }
    };
    Ok(App::new(store, config))
}

pub async fn show_usage() -> Result<()> {
    println!("Quotedesk - sales pipeline and quotation approval API");
    println!();
    println!("Commands:");
    println!("  quotedesk serve          # Run the API server");
    println!("  quotedesk seed           # Create roles and the bootstrap admin");
    println!("  quotedesk config show    # Print the effective configuration");
    println!("  quotedesk config init    # Write a default quotedesk.toml");
    println!();
    println!("Set QUOTEDESK_ADMIN_PASSWORD before the first start to create the admin account.");
    Ok(())
}
