use serde::{Deserialize, Serialize};
use tracing::info;

use super::activity;
use super::validation::{clean, require_text};
use super::{App, ListQuery, Page};
use crate::auth::{catalog, Action, CurrentUser, Permission, Resource};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::models::{new_id, ActivityAction, AuditMeta, PermissionEntry, Role, User};
use crate::store::Filter;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionView {
    pub code: String,
    pub resource: String,
    pub action: String,
    pub description: String,
}

/// The permission catalog, falling back to the built-in list before seeding
pub async fn permissions(app: &App, caller: &CurrentUser) -> ApiResult<Vec<PermissionView>> {
    caller.require(Resource::Roles, Action::View)?;
    let mut stored = app
        .collection::<PermissionEntry>()
        .find(&Filter::new())
        .await?;
    if stored.is_empty() {
        return Ok(catalog()
            .into_iter()
            .map(|p| PermissionView {
                code: p.code(),
                resource: p.resource.as_str().to_string(),
                action: p.action.as_str().to_string(),
                description: p.description(),
            })
            .collect());
    }
    stored.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(stored
        .into_iter()
        .map(|entry| PermissionView {
            code: entry.id,
            resource: entry.resource,
            action: entry.action,
            description: entry.description,
        })
        .collect())
}

/// Normalise a permission list, reporting unknown codes
fn parse_codes(errors: &mut ValidationErrors, codes: &[String]) -> Vec<String> {
    let mut parsed: Vec<Permission> = Vec::new();
    for code in codes {
        match code.parse::<Permission>() {
            Ok(permission) => parsed.push(permission),
            Err(message) => errors.add("permissions", message),
        }
    }
    parsed.sort();
    parsed.dedup();
    parsed.iter().map(Permission::code).collect()
}

pub async fn list(app: &App, caller: &CurrentUser, query: ListQuery) -> ApiResult<Page<Role>> {
    caller.require(Resource::Roles, Action::View)?;
    let mut roles = app
        .collection::<Role>()
        .find(&Filter::new().search(&["name", "description"], query.search()))
        .await?;
    roles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Page::slice(roles, &query))
}

pub async fn get(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<Role> {
    caller.require(Resource::Roles, Action::View)?;
    Ok(app.collection::<Role>().require(id).await?)
}

pub async fn create(app: &App, caller: &CurrentUser, input: CreateRole) -> ApiResult<Role> {
    caller.require(Resource::Roles, Action::Create)?;
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "name", &input.name);
    let permissions = parse_codes(&mut errors, &input.permissions);
    errors.finish()?;

    let role = Role {
        id: new_id(),
        name: input.name.trim().to_lowercase(),
        description: clean(input.description),
        permissions,
        is_system: false,
        meta: AuditMeta::created_by(caller.id()),
    };
    app.collection::<Role>().insert(&role).await?;
    info!(role = %role.name, permissions = role.permissions.len(), "Role created");
    activity::record_for(app, caller, &role, ActivityAction::Created, format!("Created role {}", role.name)).await;
    Ok(role)
}

pub async fn update(app: &App, caller: &CurrentUser, id: &str, input: UpdateRole) -> ApiResult<Role> {
    caller.require(Resource::Roles, Action::Edit)?;
    let roles = app.collection::<Role>();
    let mut role = roles.require(id).await?;

    let mut errors = ValidationErrors::new();
    if let Some(name) = input.name {
        require_text(&mut errors, "name", &name);
        let name = name.trim().to_lowercase();
        if role.is_system && name != role.name {
            return Err(ApiError::Conflict("system roles cannot be renamed".into()));
        }
        role.name = name;
    }
    if input.description.is_some() {
        role.description = clean(input.description);
    }
    if let Some(codes) = input.permissions {
        role.permissions = parse_codes(&mut errors, &codes);
    }
    errors.finish()?;

    role.meta.touch(caller.id());
    roles.update(&role).await?;
    app.enricher.invalidate::<Role>(&role.id).await;
    activity::record_for(app, caller, &role, ActivityAction::Updated, format!("Updated role {}", role.name)).await;
    Ok(role)
}

pub async fn delete(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<()> {
    caller.require(Resource::Roles, Action::Delete)?;
    let roles = app.collection::<Role>();
    let role = roles.require(id).await?;
    if role.is_system {
        return Err(ApiError::Forbidden("system roles cannot be deleted".into()));
    }
    let holders = app
        .collection::<User>()
        .find(&Filter::new().eq("role_id", role.id.as_str()))
        .await?;
    if !holders.is_empty() {
        return Err(ApiError::Conflict(format!(
            "role {} is still assigned to {} user(s)",
            role.name,
            holders.len()
        )));
    }
    let role = roles.soft_delete(role, caller.id()).await?;
    app.enricher.invalidate::<Role>(&role.id).await;
    activity::record_for(app, caller, &role, ActivityAction::Deleted, format!("Deleted role {}", role.name)).await;
    Ok(())
}
