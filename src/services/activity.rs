use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use super::pagination::newest_first;
use super::{App, ListQuery, Page};
use crate::auth::{Action, CurrentUser, Resource};
use crate::error::ApiResult;
use crate::models::{new_id, ActivityAction, ActivityLog, AuditMeta};
use crate::store::{Document, Filter};

/// Append an activity entry. Failures are logged, never returned.
pub async fn record(
    app: &App,
    actor_id: &str,
    entity_type: &str,
    entity_id: &str,
    action: ActivityAction,
    summary: impl Into<String>,
) {
    let entry = ActivityLog {
        id: new_id(),
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
        action,
        actor_id: actor_id.to_string(),
        summary: summary.into(),
        at: Utc::now(),
        meta: AuditMeta::created_by(actor_id),
    };
    if let Err(e) = app.collection::<ActivityLog>().insert(&entry).await {
        warn!(
            entity_type = %entity_type,
            entity_id = %entity_id,
            error = %e,
            "Failed to record activity"
        );
    }
}

/// Shorthand for entries about a typed document
pub async fn record_for<T: Document>(
    app: &App,
    actor: &CurrentUser,
    doc: &T,
    action: ActivityAction,
    summary: impl Into<String>,
) {
    record(app, actor.id(), T::COLLECTION, doc.id(), action, summary).await;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
}

pub async fn list(
    app: &App,
    user: &CurrentUser,
    filter: ActivityFilter,
    query: ListQuery,
) -> ApiResult<Page<ActivityLog>> {
    user.require(Resource::Activity, Action::View)?;
    let filter = Filter::new()
        .eq_opt("entity_type", filter.entity_type)
        .eq_opt("entity_id", filter.entity_id)
        .eq_opt("actor_id", filter.actor_id)
        .search(&["summary"], query.search());
    let entries = app.collection::<ActivityLog>().find(&filter).await?;
    Ok(newest_first(entries, &query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuotedeskConfig;
    use crate::store::{MockDocumentStore, StoreError};
    use std::sync::Arc;

    #[tokio::test]
    async fn store_failures_do_not_abort_the_caller() {
        let mut store = MockDocumentStore::new();
        store
            .expect_insert()
            .times(1)
            .returning(|_, _, _| Err(StoreError::Backend("disk full".to_string())));
        let app = App::new(Arc::new(store), QuotedeskConfig::default());

        record(&app, "u1", "leads", "l1", ActivityAction::Created, "Lead created").await;
    }
}
