// Document persistence - every entity is a JSON object keyed by (collection, id)

pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

use crate::models::AuditMeta;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

pub use memory::MemoryDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("document {collection}/{id} already exists")]
    DuplicateId { collection: String, id: String },
    #[error("a record with the same {fields} already exists")]
    UniqueViolation { collection: String, fields: String },
    #[error("documents must be JSON objects")]
    NotAnObject,
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A set of top-level fields that must not repeat across live documents.
///
/// Keys with a `null` component never conflict, so optional identifiers such
/// as GST numbers only constrain documents that actually carry one.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueKey {
    pub fields: Vec<(String, Value)>,
}

impl UniqueKey {
    pub fn single(field: &str, value: impl Into<Value>) -> Self {
        Self {
            fields: vec![(field.to_string(), value.into())],
        }
    }

    pub fn composite(fields: &[(&str, Value)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        }
    }

    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(" + ")
    }

    fn is_vacuous(&self) -> bool {
        self.fields.iter().any(|(_, value)| value.is_null())
    }

    pub fn matches(&self, doc: &Value) -> bool {
        !self.is_vacuous()
            && self
                .fields
                .iter()
                .all(|(name, value)| doc.get(name) == Some(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct TextSearch {
    fields: Vec<String>,
    needle: String,
}

/// Equality filter over top-level fields with an optional case-insensitive
/// substring search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
    search: Option<TextSearch>,
    include_deleted: bool,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((field.to_string(), value.into()));
        self
    }

    pub fn eq_opt<V: Into<Value>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    pub fn search(mut self, fields: &[&str], needle: Option<&str>) -> Self {
        if let Some(needle) = needle.map(str::trim).filter(|n| !n.is_empty()) {
            self.search = Some(TextSearch {
                fields: fields.iter().map(|f| f.to_string()).collect(),
                needle: needle.to_lowercase(),
            });
        }
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        if !self.include_deleted && is_deleted(doc) {
            return false;
        }
        if !self
            .conditions
            .iter()
            .all(|(field, value)| doc.get(field) == Some(value))
        {
            return false;
        }
        match &self.search {
            Some(search) => search.fields.iter().any(|field| {
                doc.get(field)
                    .and_then(Value::as_str)
                    .map(|text| text.to_lowercase().contains(&search.needle))
                    .unwrap_or(false)
            }),
            None => true,
        }
    }
}

pub fn is_deleted(doc: &Value) -> bool {
    doc.get("is_deleted").and_then(Value::as_bool).unwrap_or(false)
}

pub(crate) fn ensure_object(doc: &Value) -> StoreResult<()> {
    if doc.is_object() {
        Ok(())
    } else {
        Err(StoreError::NotAnObject)
    }
}

/// Returns the first key that a live document other than `own_id` already holds.
pub(crate) fn violated_key<'k, 'd>(
    docs: impl IntoIterator<Item = (&'d str, &'d Value)>,
    own_id: &str,
    keys: &'k [UniqueKey],
) -> Option<&'k UniqueKey> {
    let others: Vec<&Value> = docs
        .into_iter()
        .filter(|(id, doc)| *id != own_id && !is_deleted(doc))
        .map(|(_, doc)| doc)
        .collect();
    keys.iter()
        .find(|key| others.iter().any(|doc| key.matches(doc)))
}

/// Storage seam for all entity documents.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document, failing if the id is taken
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> StoreResult<()>;

    /// Insert a new document after checking the unique keys in the same critical section
    async fn insert_unique(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        keys: &[UniqueKey],
    ) -> StoreResult<()>;

    /// Fetch a document, including soft-deleted ones
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Replace an existing document; returns false when it does not exist
    async fn replace(&self, collection: &str, id: &str, doc: Value) -> StoreResult<bool>;

    async fn replace_unique(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        keys: &[UniqueKey],
    ) -> StoreResult<bool>;

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Hard delete
    async fn remove(&self, collection: &str, id: &str) -> StoreResult<bool>;
}

/// An entity persisted as a document.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const ENTITY: &'static str;

    fn id(&self) -> &str;
    fn meta(&self) -> &AuditMeta;
    fn meta_mut(&mut self) -> &mut AuditMeta;

    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }
}

/// Typed view over one collection of a [`DocumentStore`].
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<T>> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn get_live(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self.get(id).await?.filter(|doc| !doc.meta().is_deleted))
    }

    /// Live document or `NotFound`
    pub async fn require(&self, id: &str) -> StoreResult<T> {
        self.get_live(id).await?.ok_or_else(|| StoreError::NotFound {
            entity: T::ENTITY,
            id: id.to_string(),
        })
    }

    pub async fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.get_live(id).await?.is_some())
    }

    pub async fn insert(&self, doc: &T) -> StoreResult<()> {
        let value = serde_json::to_value(doc)?;
        let keys = doc.unique_keys();
        if keys.is_empty() {
            self.store.insert(T::COLLECTION, doc.id(), value).await
        } else {
            self.store
                .insert_unique(T::COLLECTION, doc.id(), value, &keys)
                .await
        }
    }

    pub async fn update(&self, doc: &T) -> StoreResult<()> {
        let value = serde_json::to_value(doc)?;
        let keys = doc.unique_keys();
        let replaced = if keys.is_empty() {
            self.store.replace(T::COLLECTION, doc.id(), value).await?
        } else {
            self.store
                .replace_unique(T::COLLECTION, doc.id(), value, &keys)
                .await?
        };
        if replaced {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: T::ENTITY,
                id: doc.id().to_string(),
            })
        }
    }

    pub async fn soft_delete(&self, mut doc: T, actor: &str) -> StoreResult<T> {
        doc.meta_mut().mark_deleted(actor);
        let value = serde_json::to_value(&doc)?;
        self.store.replace(T::COLLECTION, doc.id(), value).await?;
        Ok(doc)
    }

    pub async fn find(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        self.store
            .find(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    /// Hard delete, for documents without an audit trail such as sessions
    pub async fn remove(&self, id: &str) -> StoreResult<bool> {
        self.store.remove(T::COLLECTION, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_conditions_and_skips_deleted() {
        let filter = Filter::new().eq("status", "Draft");
        assert!(filter.matches(&json!({"status": "Draft", "is_deleted": false})));
        assert!(!filter.matches(&json!({"status": "Approved", "is_deleted": false})));
        assert!(!filter.matches(&json!({"status": "Draft", "is_deleted": true})));
        assert!(filter
            .clone()
            .with_deleted()
            .matches(&json!({"status": "Draft", "is_deleted": true})));
    }

    #[test]
    fn filter_search_is_case_insensitive_and_ignores_blank_needles() {
        let filter = Filter::new().search(&["name", "email"], Some("ACME"));
        assert!(filter.matches(&json!({"name": "Acme Industries"})));
        assert!(filter.matches(&json!({"name": "Other", "email": "ops@acme.io"})));
        assert!(!filter.matches(&json!({"name": "Globex"})));

        let blank = Filter::new().search(&["name"], Some("   "));
        assert!(blank.matches(&json!({"name": "Globex"})));
    }

    #[test]
    fn null_components_never_conflict() {
        let key = UniqueKey::single("gst_number", Value::Null);
        assert!(!key.matches(&json!({"gst_number": null})));

        let key = UniqueKey::single("gst_number", "27AAPFU0939F1ZV");
        assert!(key.matches(&json!({"gst_number": "27AAPFU0939F1ZV"})));
    }

    #[test]
    fn violated_key_ignores_self_and_deleted_documents() {
        let a = json!({"email": "a@x.io", "is_deleted": false});
        let b = json!({"email": "b@x.io", "is_deleted": true});
        let docs = vec![("a", &a), ("b", &b)];
        let keys = [UniqueKey::single("email", "a@x.io")];
        assert!(violated_key(docs.clone(), "a", &keys).is_none());
        assert!(violated_key(docs.clone(), "c", &keys).is_some());

        let keys = [UniqueKey::single("email", "b@x.io")];
        assert!(violated_key(docs, "c", &keys).is_none());
    }
}
