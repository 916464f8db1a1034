use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Path, Query};
use crate::services::attachments::UploadRequest;
use crate::services::users::{AssignRole, CreateUser, UpdateUser, UserView};
use crate::services::{self, App, ListQuery, Page};

pub fn router() -> Router<App> {
    Router::new()
        .route("/users", get(list).post(create))
        .route("/users/me/photo", put(set_photo))
        .route("/users/:id", get(fetch).put(update).delete(remove))
        .route("/users/:id/role", put(assign_role))
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<UserView>>> {
    services::users::list(&app, &caller, query).await.map(Json)
}

async fn create(
    State(app): State<App>,
    caller: CurrentUser,
    Json(input): Json<CreateUser>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let user = services::users::create(&app, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn fetch(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<UserView>> {
    services::users::get(&app, &caller, &id).await.map(Json)
}

async fn update(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateUser>,
) -> ApiResult<Json<UserView>> {
    services::users::update(&app, &caller, &id, input).await.map(Json)
}

async fn remove(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services::users::delete(&app, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn assign_role(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<AssignRole>,
) -> ApiResult<Json<UserView>> {
    services::users::assign_role(&app, &caller, &id, input).await.map(Json)
}

async fn set_photo(
    State(app): State<App>,
    caller: CurrentUser,
    Json(upload): Json<UploadRequest>,
) -> ApiResult<Json<UserView>> {
    services::users::set_photo(&app, &caller, upload).await.map(Json)
}
