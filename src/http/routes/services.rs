use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Path, Query};
use crate::services::service_delivery::{
    CreateServiceDelivery, MilestoneInput, ServiceDeliveryFilter, ServiceDeliveryView,
    StatusChange, UpdateServiceDelivery,
};
use crate::services::{self, App, ListQuery, Page};

pub fn router() -> Router<App> {
    Router::new()
        .route("/services", get(list).post(create))
        .route("/services/:id", get(fetch).put(update).delete(remove))
        .route("/services/:id/milestones", post(add_milestone))
        .route(
            "/services/:id/milestones/:milestone_id/complete",
            post(complete_milestone),
        )
        .route("/services/:id/status", post(change_status))
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(filter): Query<ServiceDeliveryFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<ServiceDeliveryView>>> {
    services::service_delivery::list(&app, &caller, filter, query)
        .await
        .map(Json)
}

async fn create(
    State(app): State<App>,
    caller: CurrentUser,
    Json(input): Json<CreateServiceDelivery>,
) -> ApiResult<(StatusCode, Json<ServiceDeliveryView>)> {
    let delivery = services::service_delivery::create(&app, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

async fn fetch(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ServiceDeliveryView>> {
    services::service_delivery::get(&app, &caller, &id)
        .await
        .map(Json)
}

async fn update(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateServiceDelivery>,
) -> ApiResult<Json<ServiceDeliveryView>> {
    services::service_delivery::update(&app, &caller, &id, input)
        .await
        .map(Json)
}

async fn remove(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services::service_delivery::delete(&app, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_milestone(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<MilestoneInput>,
) -> ApiResult<(StatusCode, Json<ServiceDeliveryView>)> {
    let delivery = services::service_delivery::add_milestone(&app, &caller, &id, input).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

async fn complete_milestone(
    State(app): State<App>,
    caller: CurrentUser,
    Path((id, milestone_id)): Path<(String, String)>,
) -> ApiResult<Json<ServiceDeliveryView>> {
    services::service_delivery::complete_milestone(&app, &caller, &id, &milestone_id)
        .await
        .map(Json)
}

async fn change_status(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Json<ServiceDeliveryView>> {
    services::service_delivery::change_status(&app, &caller, &id, change)
        .await
        .map(Json)
}
