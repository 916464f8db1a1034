use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Path, Query};
use crate::models::MasterData;
use crate::services::master_data::{CreateMasterData, MasterDataFilter, UpdateMasterData};
use crate::services::{self, App, ListQuery, Page};

pub fn router() -> Router<App> {
    Router::new()
        .route("/master-data", get(list).post(create))
        .route("/master-data/:id", put(update).delete(remove))
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(filter): Query<MasterDataFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<MasterData>>> {
    services::master_data::list(&app, &caller, filter, query)
        .await
        .map(Json)
}

async fn create(
    State(app): State<App>,
    caller: CurrentUser,
    Json(input): Json<CreateMasterData>,
) -> ApiResult<(StatusCode, Json<MasterData>)> {
    let entry = services::master_data::create(&app, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn update(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateMasterData>,
) -> ApiResult<Json<MasterData>> {
    services::master_data::update(&app, &caller, &id, input)
        .await
        .map(Json)
}

async fn remove(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services::master_data::delete(&app, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
