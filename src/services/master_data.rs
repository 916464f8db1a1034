use serde::Deserialize;

use super::activity;
use super::validation::{clean, require_text};
use super::{App, ListQuery, Page};
use crate::auth::{Action, CurrentUser, Resource};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::models::{new_id, ActivityAction, AuditMeta, MasterCategory, MasterData};
use crate::store::Filter;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterDataFilter {
    pub category: Option<MasterCategory>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMasterData {
    pub category: MasterCategory,
    pub name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMasterData {
    pub name: Option<String>,
    pub code: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list(
    app: &App,
    caller: &CurrentUser,
    filter: MasterDataFilter,
    query: ListQuery,
) -> ApiResult<Page<MasterData>> {
    caller.require(Resource::MasterData, Action::View)?;
    let filter = Filter::new()
        .eq_opt("category", filter.category.map(|c| c.as_str()))
        .eq_opt("is_active", filter.is_active)
        .search(&["name", "code"], query.search());
    let mut entries = app.collection::<MasterData>().find(&filter).await?;
    entries.sort_by(|a, b| {
        (a.category.as_str(), a.name.to_lowercase()).cmp(&(b.category.as_str(), b.name.to_lowercase()))
    });
    Ok(Page::slice(entries, &query))
}

pub async fn create(
    app: &App,
    caller: &CurrentUser,
    input: CreateMasterData,
) -> ApiResult<MasterData> {
    caller.require(Resource::MasterData, Action::Create)?;
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "name", &input.name);
    errors.finish()?;

    let mut entry = MasterData {
        id: new_id(),
        category: input.category,
        name: String::new(),
        name_key: String::new(),
        code: clean(input.code),
        is_active: true,
        meta: AuditMeta::created_by(caller.id()),
    };
    entry.set_name(&input.name);
    app.collection::<MasterData>().insert(&entry).await?;
    activity::record_for(
        app,
        caller,
        &entry,
        ActivityAction::Created,
        format!("Created {} '{}'", entry.category.as_str(), entry.name),
    )
    .await;
    Ok(entry)
}

pub async fn update(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: UpdateMasterData,
) -> ApiResult<MasterData> {
    caller.require(Resource::MasterData, Action::Edit)?;
    let collection = app.collection::<MasterData>();
    let mut entry = collection.require(id).await?;
    if let Some(name) = input.name {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "name", &name);
        errors.finish()?;
        entry.set_name(&name);
    }
    if input.code.is_some() {
        entry.code = clean(input.code);
    }
    if let Some(is_active) = input.is_active {
        entry.is_active = is_active;
    }
    entry.meta.touch(caller.id());
    collection.update(&entry).await?;
    app.enricher.invalidate::<MasterData>(&entry.id).await;
    activity::record_for(app, caller, &entry, ActivityAction::Updated, format!("Updated '{}'", entry.name)).await;
    Ok(entry)
}

pub async fn delete(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<()> {
    caller.require(Resource::MasterData, Action::Delete)?;
    let collection = app.collection::<MasterData>();
    let entry = collection.require(id).await?;
    let entry = collection.soft_delete(entry, caller.id()).await?;
    app.enricher.invalidate::<MasterData>(&entry.id).await;
    activity::record_for(app, caller, &entry, ActivityAction::Deleted, format!("Deleted '{}'", entry.name)).await;
    Ok(())
}

/// Ensure `id` names a live, active entry of `category`
pub async fn require_reference(
    app: &App,
    field: &str,
    category: MasterCategory,
    id: Option<&str>,
) -> ApiResult<()> {
    let Some(id) = id else {
        return Ok(());
    };
    match app.collection::<MasterData>().get_live(id).await? {
        Some(entry) if entry.category == category && entry.is_active => Ok(()),
        Some(_) => Err(ApiError::invalid(
            field,
            format!("must reference an active {} entry", category.as_str()),
        )),
        None => Err(ApiError::invalid(field, format!("{} '{id}' does not exist", category.as_str()))),
    }
}
