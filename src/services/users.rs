use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::activity;
use super::attachments::{self, UploadRequest};
use super::pagination::newest_first;
use super::validation::{check_email, check_phone, clean, require_text};
use super::{App, ListQuery, Page};
use crate::auth::{check_strength, hash_password, Action, CurrentUser, Resource};
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::models::{new_id, ActivityAction, Attachment, AuditMeta, Role, Session, User};
use crate::store::{Document, Filter};

/// User as returned by the API; never carries the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role_id: String,
    pub role_name: Option<String>,
    pub is_active: bool,
    pub photo_attachment_id: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn view(app: &App, user: User) -> UserView {
    let role_name = app.enricher.name::<Role>(Some(&user.role_id)).await;
    UserView {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        phone: user.phone,
        role_id: user.role_id,
        role_name,
        is_active: user.is_active,
        photo_attachment_id: user.photo_attachment_id,
        last_login_at: user.last_login_at,
        created_at: user.meta.created_at,
        updated_at: user.meta.updated_at,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role_id: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRole {
    pub role_id: String,
}

pub async fn list(app: &App, caller: &CurrentUser, query: ListQuery) -> ApiResult<Page<UserView>> {
    caller.require(Resource::Users, Action::View)?;
    let filter = Filter::new().search(&["full_name", "email"], query.search());
    let users = app.collection::<User>().find(&filter).await?;
    Ok(newest_first(users, &query)
        .map_async(|user| view(app, user))
        .await)
}

pub async fn get(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<UserView> {
    if caller.id() != id {
        caller.require(Resource::Users, Action::View)?;
    }
    let user = app.collection::<User>().require(id).await?;
    Ok(view(app, user).await)
}

pub async fn create(app: &App, caller: &CurrentUser, input: CreateUser) -> ApiResult<UserView> {
    caller.require(Resource::Users, Action::Create)?;

    let email = input.email.trim().to_lowercase();
    let phone = clean(input.phone);
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "full_name", &input.full_name);
    require_text(&mut errors, "email", &email);
    check_email(&mut errors, "email", Some(email.as_str()).filter(|e| !e.is_empty()));
    check_phone(&mut errors, "phone", phone.as_deref());
    if let Err(message) = check_strength(&input.password) {
        errors.add("password", message);
    }
    errors.finish()?;

    app.collection::<Role>().require(&input.role_id).await?;

    let user = User {
        id: new_id(),
        email,
        full_name: input.full_name.trim().to_string(),
        phone,
        role_id: input.role_id,
        password_hash: hash_password(&input.password, app.config.auth.bcrypt_cost).await?,
        is_active: true,
        photo_attachment_id: None,
        last_login_at: None,
        meta: AuditMeta::created_by(caller.id()),
    };
    app.collection::<User>().insert(&user).await?;
    info!(user_id = %user.id, email = %user.email, "User created");
    activity::record_for(app, caller, &user, ActivityAction::Created, format!("Created user {}", user.email)).await;
    Ok(view(app, user).await)
}

pub async fn update(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: UpdateUser,
) -> ApiResult<UserView> {
    caller.require(Resource::Users, Action::Edit)?;
    let users = app.collection::<User>();
    let mut user = users.require(id).await?;

    let mut errors = ValidationErrors::new();
    if let Some(email) = input.email {
        let email = email.trim().to_lowercase();
        check_email(&mut errors, "email", Some(email.as_str()));
        user.email = email;
    }
    if let Some(full_name) = input.full_name {
        require_text(&mut errors, "full_name", &full_name);
        user.full_name = full_name.trim().to_string();
    }
    if input.phone.is_some() {
        user.phone = clean(input.phone);
        check_phone(&mut errors, "phone", user.phone.as_deref());
    }
    errors.finish()?;
    if let Some(is_active) = input.is_active {
        if !is_active && user.id == caller.id() {
            return Err(ApiError::BadRequest("you cannot deactivate your own account".into()));
        }
        user.is_active = is_active;
    }

    user.meta.touch(caller.id());
    users.update(&user).await?;
    if !user.is_active {
        revoke_sessions(app, &user.id).await?;
    }
    app.enricher.invalidate::<User>(&user.id).await;
    activity::record_for(app, caller, &user, ActivityAction::Updated, "Updated user profile").await;
    Ok(view(app, user).await)
}

pub async fn assign_role(
    app: &App,
    caller: &CurrentUser,
    id: &str,
    input: AssignRole,
) -> ApiResult<UserView> {
    caller.require(Resource::Users, Action::Edit)?;
    let role = app.collection::<Role>().require(&input.role_id).await?;
    let users = app.collection::<User>();
    let mut user = users.require(id).await?;
    user.role_id = role.id.clone();
    user.meta.touch(caller.id());
    users.update(&user).await?;
    info!(user_id = %user.id, role = %role.name, "Role assigned");
    activity::record_for(
        app,
        caller,
        &user,
        ActivityAction::Updated,
        format!("Assigned role {}", role.name),
    )
    .await;
    Ok(view(app, user).await)
}

/// Soft delete, deactivate and sign out everywhere
pub async fn delete(app: &App, caller: &CurrentUser, id: &str) -> ApiResult<()> {
    caller.require(Resource::Users, Action::Delete)?;
    if caller.id() == id {
        return Err(ApiError::BadRequest("you cannot delete your own account".into()));
    }
    let users = app.collection::<User>();
    let mut user = users.require(id).await?;
    user.is_active = false;
    let user = users.soft_delete(user, caller.id()).await?;
    let revoked = revoke_sessions(app, &user.id).await?;
    app.enricher.invalidate::<User>(&user.id).await;
    info!(user_id = %user.id, sessions_revoked = revoked, "User deleted");
    activity::record_for(app, caller, &user, ActivityAction::Deleted, format!("Deleted user {}", user.email)).await;
    Ok(())
}

pub async fn revoke_sessions(app: &App, user_id: &str) -> ApiResult<usize> {
    let sessions = app.collection::<Session>();
    let live = sessions
        .find(&Filter::new().eq("user_id", user_id).with_deleted())
        .await?;
    for session in &live {
        sessions.remove(session.id()).await?;
    }
    Ok(live.len())
}

/// Replace the caller's profile photo
pub async fn set_photo(
    app: &App,
    caller: &CurrentUser,
    upload: UploadRequest,
) -> ApiResult<UserView> {
    if !upload.content_type.starts_with("image/") {
        return Err(ApiError::invalid("content_type", "profile photos must be images"));
    }
    let attachment: Attachment = attachments::store_upload(
        app,
        caller,
        User::COLLECTION,
        caller.id(),
        upload,
    )
    .await?;

    let users = app.collection::<User>();
    let mut user = users.require(caller.id()).await?;
    user.photo_attachment_id = Some(attachment.id.clone());
    user.meta.touch(caller.id());
    users.update(&user).await?;
    Ok(view(app, user).await)
}
