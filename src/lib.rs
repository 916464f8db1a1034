// Quotedesk library: CRM/ERP backend for leads, opportunities, quotations and service delivery.
// The binary in main.rs is a thin clap front end over these modules.

pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod models;
pub mod observability;
pub mod services;
pub mod shutdown;
pub mod store;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use auth::CurrentUser;
pub use config::{config, QuotedeskConfig};
pub use database::{init_database, shutdown_database};
pub use error::{ApiError, ApiResult};
pub use http::build_router;
pub use observability::{api_metrics, ApiMetrics, OperationTimer};
pub use services::App;
pub use shutdown::ShutdownCoordinator;
pub use store::{DocumentStore, MemoryDocumentStore};
pub use telemetry::{create_workflow_span, init_telemetry, shutdown_telemetry};
pub use workflows::{QuotationEvent, QuotationWorkflow, TransitionError};
