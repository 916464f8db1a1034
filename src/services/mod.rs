// Business operations behind the HTTP routes. Each operation checks the
// caller's permission, validates input, writes through the document store
// and returns an enriched view.

pub mod activity;
pub mod attachments;
pub mod auth;
pub mod companies;
pub mod enrichment;
pub mod exports;
pub mod leads;
pub mod master_data;
pub mod opportunities;
pub mod pagination;
pub mod partners;
pub mod quotations;
pub mod roles;
pub mod seed;
pub mod service_delivery;
pub mod users;
pub mod validation;

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::LoginThrottle;
use crate::config::QuotedeskConfig;
use crate::store::{Collection, Document, DocumentStore};

pub use enrichment::Enricher;
pub use pagination::{ListQuery, Page};

/// Shared application state handed to every request
#[derive(Clone)]
pub struct App {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<QuotedeskConfig>,
    pub enricher: Enricher,
    pub throttle: Arc<LoginThrottle>,
}

impl App {
    pub fn new(store: Arc<dyn DocumentStore>, config: QuotedeskConfig) -> Self {
        let enricher = Enricher::new(store.clone(), &config.enrichment);
        let throttle = Arc::new(LoginThrottle::new(config.auth.login_attempts_per_minute));
        Self {
            store,
            config: Arc::new(config),
            enricher,
            throttle,
        }
    }

    pub fn collection<T: Document>(&self) -> Collection<T> {
        Collection::new(self.store.clone())
    }

    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.uploads.upload_dir)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").finish_non_exhaustive()
    }
}
