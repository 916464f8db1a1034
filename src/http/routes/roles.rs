use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Path, Query};
use crate::models::Role;
use crate::services::roles::{CreateRole, PermissionView, UpdateRole};
use crate::services::{self, App, ListQuery, Page};

pub fn router() -> Router<App> {
    Router::new()
        .route("/permissions", get(permissions))
        .route("/roles", get(list).post(create))
        .route("/roles/:id", get(fetch).put(update).delete(remove))
}

async fn permissions(
    State(app): State<App>,
    caller: CurrentUser,
) -> ApiResult<Json<Vec<PermissionView>>> {
    services::roles::permissions(&app, &caller).await.map(Json)
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<Role>>> {
    services::roles::list(&app, &caller, query).await.map(Json)
}

async fn create(
    State(app): State<App>,
    caller: CurrentUser,
    Json(input): Json<CreateRole>,
) -> ApiResult<(StatusCode, Json<Role>)> {
    let role = services::roles::create(&app, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

async fn fetch(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Role>> {
    services::roles::get(&app, &caller, &id).await.map(Json)
}

async fn update(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateRole>,
) -> ApiResult<Json<Role>> {
    services::roles::update(&app, &caller, &id, input).await.map(Json)
}

async fn remove(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services::roles::delete(&app, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
