use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::models::Named;
use crate::store::{Collection, Document, DocumentStore};

/// Resolves foreign-key ids to display names, cached by `collection/id`
#[derive(Clone)]
pub struct Enricher {
    store: Arc<dyn DocumentStore>,
    cache: Cache<String, Option<String>>,
}

impl Enricher {
    pub fn new(store: Arc<dyn DocumentStore>, config: &EnrichmentConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();
        Self { store, cache }
    }

    fn key<T: Document>(id: &str) -> String {
        format!("{}/{}", T::COLLECTION, id)
    }

    /// Display name of a live document, `None` for missing ids
    pub async fn name<T: Document + Named>(&self, id: Option<&str>) -> Option<String> {
        let id = id?;
        let key = Self::key::<T>(id);
        if let Some(hit) = self.cache.get(&key).await {
            return hit;
        }
        let name = match Collection::<T>::new(self.store.clone()).get_live(id).await {
            Ok(doc) => doc.map(|doc| doc.display_name()),
            Err(e) => {
                // Not cached so the next read retries
                warn!(collection = T::COLLECTION, id = %id, error = %e, "Enrichment lookup failed");
                return None;
            }
        };
        debug!(collection = T::COLLECTION, id = %id, "Enrichment cache miss");
        self.cache.insert(key, name.clone()).await;
        name
    }

    pub async fn invalidate<T: Document>(&self, id: &str) {
        self.cache.invalidate(&Self::key::<T>(id)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditMeta, MasterCategory, MasterData};
    use crate::store::MemoryDocumentStore;

    #[tokio::test]
    async fn names_are_cached_until_invalidated() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let enricher = Enricher::new(store.clone(), &EnrichmentConfig::default());
        let collection = Collection::<MasterData>::new(store);
        let mut entry = MasterData {
            id: "m1".to_string(),
            category: MasterCategory::Industry,
            name: "Retail".to_string(),
            name_key: "retail".to_string(),
            code: None,
            is_active: true,
            meta: AuditMeta::created_by("u1"),
        };
        collection.insert(&entry).await.unwrap();
        assert_eq!(enricher.name::<MasterData>(Some("m1")).await.as_deref(), Some("Retail"));

        entry.name = "Retail & FMCG".to_string();
        collection.update(&entry).await.unwrap();
        assert_eq!(enricher.name::<MasterData>(Some("m1")).await.as_deref(), Some("Retail"));

        enricher.invalidate::<MasterData>("m1").await;
        assert_eq!(
            enricher.name::<MasterData>(Some("m1")).await.as_deref(),
            Some("Retail & FMCG")
        );
        assert_eq!(enricher.name::<MasterData>(None).await, None);
        assert_eq!(enricher.name::<MasterData>(Some("missing")).await, None);
    }
}
