use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Path, Query};
use crate::services::opportunities::{
    AdvanceRequest, LoseRequest, OpportunityFilter, OpportunityInput, OpportunityView, Pipeline,
    QualificationUpdate,
};
use crate::services::{self, App, ListQuery, Page};

pub fn router() -> Router<App> {
    Router::new()
        .route("/opportunities", get(list).post(create))
        .route("/opportunities/pipeline", get(pipeline))
        .route("/opportunities/:id", get(fetch).put(update).delete(remove))
        .route("/opportunities/:id/qualification", put(set_qualification))
        .route("/opportunities/:id/advance", post(advance))
        .route("/opportunities/:id/lose", post(lose))
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(filter): Query<OpportunityFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<OpportunityView>>> {
    services::opportunities::list(&app, &caller, filter, query)
        .await
        .map(Json)
}

async fn pipeline(State(app): State<App>, caller: CurrentUser) -> ApiResult<Json<Pipeline>> {
    services::opportunities::pipeline(&app, &caller).await.map(Json)
}

async fn create(
    State(app): State<App>,
    caller: CurrentUser,
    Json(input): Json<OpportunityInput>,
) -> ApiResult<(StatusCode, Json<OpportunityView>)> {
    let opportunity = services::opportunities::create(&app, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(opportunity)))
}

async fn fetch(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<OpportunityView>> {
    services::opportunities::get(&app, &caller, &id).await.map(Json)
}

async fn update(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<OpportunityInput>,
) -> ApiResult<Json<OpportunityView>> {
    services::opportunities::update(&app, &caller, &id, input)
        .await
        .map(Json)
}

async fn remove(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services::opportunities::delete(&app, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_qualification(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<QualificationUpdate>,
) -> ApiResult<Json<OpportunityView>> {
    services::opportunities::set_qualification(&app, &caller, &id, input)
        .await
        .map(Json)
}

async fn advance(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<AdvanceRequest>,
) -> ApiResult<Json<OpportunityView>> {
    services::opportunities::advance(&app, &caller, &id, request)
        .await
        .map(Json)
}

async fn lose(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<LoseRequest>,
) -> ApiResult<Json<OpportunityView>> {
    services::opportunities::lose(&app, &caller, &id, request)
        .await
        .map(Json)
}
