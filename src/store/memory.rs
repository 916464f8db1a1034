use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{ensure_object, violated_key, DocumentStore, Filter, StoreError, StoreResult, UniqueKey};

/// In-process document store. Uniqueness checks and writes happen under the
/// same write lock, so concurrent inserts cannot both pass the check.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

fn unique_violation(collection: &str, key: &UniqueKey) -> StoreError {
    StoreError::UniqueViolation {
        collection: collection.to_string(),
        fields: key.describe(),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> StoreResult<()> {
        self.insert_unique(collection, id, doc, &[]).await
    }

    async fn insert_unique(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        keys: &[UniqueKey],
    ) -> StoreResult<()> {
        ensure_object(&doc)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        if let Some(key) = violated_key(docs.iter().map(|(k, v)| (k.as_str(), v)), id, keys) {
            return Err(unique_violation(collection, key));
        }
        docs.insert(id.to_string(), doc);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn replace(&self, collection: &str, id: &str, doc: Value) -> StoreResult<bool> {
        self.replace_unique(collection, id, doc, &[]).await
    }

    async fn replace_unique(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        keys: &[UniqueKey],
    ) -> StoreResult<bool> {
        ensure_object(&doc)?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        if !docs.contains_key(id) {
            return Ok(false);
        }
        if let Some(key) = violated_key(docs.iter().map(|(k, v)| (k.as_str(), v)), id, keys) {
            return Err(unique_violation(collection, key));
        }
        docs.insert(id.to_string(), doc);
        Ok(true)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<bool> {
        Ok(self
            .collections
            .write()
            .await
            .get_mut(collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }
}
