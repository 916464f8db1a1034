use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Path, Query};
use crate::services::partners::{PartnerFilter, PartnerInput, PartnerView};
use crate::services::{self, App, ListQuery, Page};

pub fn router() -> Router<App> {
    Router::new()
        .route("/partners", get(list).post(create))
        .route("/partners/:id", get(fetch).put(update).delete(remove))
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(filter): Query<PartnerFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<PartnerView>>> {
    services::partners::list(&app, &caller, filter, query)
        .await
        .map(Json)
}

async fn create(
    State(app): State<App>,
    caller: CurrentUser,
    Json(input): Json<PartnerInput>,
) -> ApiResult<(StatusCode, Json<PartnerView>)> {
    let partner = services::partners::create(&app, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(partner)))
}

async fn fetch(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PartnerView>> {
    services::partners::get(&app, &caller, &id).await.map(Json)
}

async fn update(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<PartnerInput>,
) -> ApiResult<Json<PartnerView>> {
    services::partners::update(&app, &caller, &id, input)
        .await
        .map(Json)
}

async fn remove(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services::partners::delete(&app, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
