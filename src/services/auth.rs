use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::activity;
use super::users::{self, UserView};
use super::App;
use crate::auth::{
    check_strength, generate_token, hash_password, token_digest, verify_password, CurrentUser,
};
use crate::error::{ApiError, ApiResult};
use crate::models::{ActivityAction, AuditMeta, Role, Session, User};
use crate::observability::api_metrics;
use crate::store::{Document, Filter};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserView,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn bad_credentials() -> ApiError {
    api_metrics().record_auth_failure();
    ApiError::Unauthorized("invalid email or password".into())
}

pub async fn login(app: &App, request: LoginRequest) -> ApiResult<LoginResponse> {
    let email = request.email.trim().to_lowercase();
    if !app.throttle.try_attempt(&email) {
        warn!(email = %email, "Login throttled");
        api_metrics().record_auth_failure();
        return Err(ApiError::TooManyRequests(
            "too many login attempts, try again in a minute".into(),
        ));
    }

    let users = app.collection::<User>();
    let mut user = match users.find(&Filter::new().eq("email", email.as_str())).await?.pop() {
        Some(user) => user,
        None => return Err(bad_credentials()),
    };
    if !user.is_active || !verify_password(&request.password, &user.password_hash).await {
        warn!(user_id = %user.id, "Rejected login");
        return Err(bad_credentials());
    }

    let token = generate_token();
    let expires_at = Utc::now() + Duration::minutes(app.config.auth.token_ttl_minutes);
    let session = Session {
        id: token_digest(&token),
        user_id: user.id.clone(),
        expires_at,
        meta: AuditMeta::created_by(&user.id),
    };
    app.collection::<Session>().insert(&session).await?;

    user.last_login_at = Some(Utc::now());
    users.update(&user).await?;
    info!(user_id = %user.id, "User logged in");
    activity::record(
        app,
        &user.id,
        User::COLLECTION,
        &user.id,
        ActivityAction::LoggedIn,
        "Logged in",
    )
    .await;

    Ok(LoginResponse {
        access_token: token,
        token_type: "bearer",
        expires_at,
        user: users::view(app, user).await,
    })
}

/// Resolve a bearer token to its user. Expired sessions are purged.
pub async fn authenticate(app: &App, token: &str) -> ApiResult<CurrentUser> {
    let unauthorized = || {
        api_metrics().record_auth_failure();
        ApiError::Unauthorized("invalid or expired token".into())
    };
    let digest = token_digest(token);
    let sessions = app.collection::<Session>();
    let session = match sessions.get_live(&digest).await? {
        Some(session) => session,
        None => return Err(unauthorized()),
    };
    if session.is_expired(Utc::now()) {
        sessions.remove(&digest).await?;
        return Err(unauthorized());
    }
    let user = match app.collection::<User>().get_live(&session.user_id).await? {
        Some(user) if user.is_active => user,
        _ => return Err(unauthorized()),
    };
    let role = match app.collection::<Role>().get_live(&user.role_id).await? {
        Some(role) => role,
        None => {
            warn!(user_id = %user.id, role_id = %user.role_id, "User has no live role");
            return Err(ApiError::Forbidden("your role no longer exists".into()));
        }
    };
    Ok(CurrentUser::new(user, role, digest))
}

pub async fn logout(app: &App, caller: &CurrentUser) -> ApiResult<()> {
    app.collection::<Session>().remove(&caller.session_id).await?;
    info!(user_id = %caller.id(), "User logged out");
    activity::record(
        app,
        caller.id(),
        User::COLLECTION,
        caller.id(),
        ActivityAction::LoggedOut,
        "Logged out",
    )
    .await;
    Ok(())
}

pub async fn me(app: &App, caller: &CurrentUser) -> MeResponse {
    MeResponse {
        user: users::view(app, caller.user.clone()).await,
        permissions: caller.permissions.iter().cloned().collect(),
    }
}

pub async fn change_password(
    app: &App,
    caller: &CurrentUser,
    request: ChangePasswordRequest,
) -> ApiResult<()> {
    let users = app.collection::<User>();
    let mut user = users.require(caller.id()).await?;
    if !verify_password(&request.current_password, &user.password_hash).await {
        return Err(ApiError::BadRequest("current password is incorrect".into()));
    }
    check_strength(&request.new_password)
        .map_err(|message| ApiError::invalid("new_password", message))?;

    user.password_hash = hash_password(&request.new_password, app.config.auth.bcrypt_cost).await?;
    user.meta.touch(caller.id());
    users.update(&user).await?;
    info!(user_id = %user.id, "Password changed");
    activity::record_for(app, caller, &user, ActivityAction::Updated, "Changed password").await;
    Ok(())
}
