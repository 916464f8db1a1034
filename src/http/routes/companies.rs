use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Path, Query};
use crate::services::companies::{CompanyFilter, CompanyInput, CompanyView};
use crate::services::{self, App, ListQuery, Page};

pub fn router() -> Router<App> {
    Router::new()
        .route("/companies", get(list).post(create))
        .route("/companies/:id", get(fetch).put(update).delete(remove))
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(filter): Query<CompanyFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<CompanyView>>> {
    services::companies::list(&app, &caller, filter, query)
        .await
        .map(Json)
}

async fn create(
    State(app): State<App>,
    caller: CurrentUser,
    Json(input): Json<CompanyInput>,
) -> ApiResult<(StatusCode, Json<CompanyView>)> {
    let company = services::companies::create(&app, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

async fn fetch(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<CompanyView>> {
    services::companies::get(&app, &caller, &id).await.map(Json)
}

async fn update(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<CompanyInput>,
) -> ApiResult<Json<CompanyView>> {
    services::companies::update(&app, &caller, &id, input)
        .await
        .map(Json)
}

async fn remove(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services::companies::delete(&app, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
