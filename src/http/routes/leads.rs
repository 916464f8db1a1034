use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Path, Query};
use crate::services::leads::{Conversion, LeadFilter, LeadInput, LeadView, RejectLead};
use crate::services::{self, App, ListQuery, Page};

pub fn router() -> Router<App> {
    Router::new()
        .route("/leads", get(list).post(create))
        .route("/leads/:id", get(fetch).put(update).delete(remove))
        .route("/leads/:id/approve", post(approve))
        .route("/leads/:id/reject", post(reject))
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(filter): Query<LeadFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<LeadView>>> {
    services::leads::list(&app, &caller, filter, query).await.map(Json)
}

async fn create(
    State(app): State<App>,
    caller: CurrentUser,
    Json(input): Json<LeadInput>,
) -> ApiResult<(StatusCode, Json<LeadView>)> {
    let lead = services::leads::create(&app, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

async fn fetch(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<LeadView>> {
    services::leads::get(&app, &caller, &id).await.map(Json)
}

async fn update(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<LeadInput>,
) -> ApiResult<Json<LeadView>> {
    services::leads::update(&app, &caller, &id, input).await.map(Json)
}

async fn remove(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services::leads::delete(&app, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 201 when the opportunity was created by this call, 200 when it already existed
async fn approve(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Conversion>)> {
    let conversion = services::leads::approve(&app, &caller, &id).await?;
    let status = if conversion.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(conversion)))
}

async fn reject(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<RejectLead>,
) -> ApiResult<Json<LeadView>> {
    services::leads::reject(&app, &caller, &id, input).await.map(Json)
}
