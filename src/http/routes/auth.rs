use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::Json;
use crate::services::auth::{ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse};
use crate::services::{self, App};

pub fn router() -> Router<App> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/change-password", post(change_password))
}

async fn login(
    State(app): State<App>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    services::auth::login(&app, request).await.map(Json)
}

async fn logout(State(app): State<App>, caller: CurrentUser) -> ApiResult<StatusCode> {
    services::auth::logout(&app, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(State(app): State<App>, caller: CurrentUser) -> Json<MeResponse> {
    Json(services::auth::me(&app, &caller).await)
}

async fn change_password(
    State(app): State<App>,
    caller: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    services::auth::change_password(&app, &caller, request).await?;
    Ok(StatusCode::NO_CONTENT)
}
