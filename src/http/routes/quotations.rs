use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Path, Query};
use crate::services::exports::{ExportQuery, QuotationExport};
use crate::services::quotations::{
    CreateQuotation, GroupInput, ItemInput, PhaseInput, QuotationDetail, QuotationFilter,
    QuotationSummary, RejectQuotation, UpdateQuotation,
};
use crate::services::{self, App, ListQuery, Page};

type Detail = ApiResult<Json<QuotationDetail>>;

pub fn router() -> Router<App> {
    Router::new()
        .route("/quotations", get(list).post(create))
        .route("/quotations/:id", get(fetch).put(update).delete(remove))
        .route("/quotations/:id/export", get(export))
        .route("/quotations/:id/submit", post(submit))
        .route("/quotations/:id/approve", post(approve))
        .route("/quotations/:id/reject", post(reject))
        .route("/quotations/:id/revise", post(revise))
        .route("/quotations/:id/phases", post(add_phase))
        .route(
            "/quotations/:id/phases/:phase_id",
            put(update_phase).delete(delete_phase),
        )
        .route("/quotations/:id/phases/:phase_id/groups", post(add_group))
        .route(
            "/quotations/:id/groups/:group_id",
            put(update_group).delete(delete_group),
        )
        .route("/quotations/:id/groups/:group_id/items", post(add_item))
        .route(
            "/quotations/:id/items/:item_id",
            put(update_item).delete(delete_item),
        )
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(filter): Query<QuotationFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<QuotationSummary>>> {
    services::quotations::list(&app, &caller, filter, query)
        .await
        .map(Json)
}

async fn create(
    State(app): State<App>,
    caller: CurrentUser,
    Json(input): Json<CreateQuotation>,
) -> ApiResult<(StatusCode, Json<QuotationDetail>)> {
    let quotation = services::quotations::create(&app, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

async fn fetch(State(app): State<App>, caller: CurrentUser, Path(id): Path<String>) -> Detail {
    services::quotations::get(&app, &caller, &id).await.map(Json)
}

async fn update(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateQuotation>,
) -> Detail {
    services::quotations::update(&app, &caller, &id, input)
        .await
        .map(Json)
}

async fn remove(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services::quotations::delete(&app, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn export(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Json<QuotationExport>> {
    services::exports::export_quotation(&app, &caller, &id, query)
        .await
        .map(Json)
}

async fn submit(State(app): State<App>, caller: CurrentUser, Path(id): Path<String>) -> Detail {
    services::quotations::submit(&app, &caller, &id).await.map(Json)
}

async fn approve(State(app): State<App>, caller: CurrentUser, Path(id): Path<String>) -> Detail {
    services::quotations::approve(&app, &caller, &id).await.map(Json)
}

async fn reject(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<RejectQuotation>,
) -> Detail {
    services::quotations::reject(&app, &caller, &id, input)
        .await
        .map(Json)
}

async fn revise(State(app): State<App>, caller: CurrentUser, Path(id): Path<String>) -> Detail {
    services::quotations::revise(&app, &caller, &id).await.map(Json)
}

async fn add_phase(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<PhaseInput>,
) -> ApiResult<(StatusCode, Json<QuotationDetail>)> {
    let quotation = services::quotations::add_phase(&app, &caller, &id, input).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

async fn update_phase(
    State(app): State<App>,
    caller: CurrentUser,
    Path((id, phase_id)): Path<(String, String)>,
    Json(input): Json<PhaseInput>,
) -> Detail {
    services::quotations::update_phase(&app, &caller, &id, &phase_id, input)
        .await
        .map(Json)
}

async fn delete_phase(
    State(app): State<App>,
    caller: CurrentUser,
    Path((id, phase_id)): Path<(String, String)>,
) -> Detail {
    services::quotations::delete_phase(&app, &caller, &id, &phase_id)
        .await
        .map(Json)
}

async fn add_group(
    State(app): State<App>,
    caller: CurrentUser,
    Path((id, phase_id)): Path<(String, String)>,
    Json(input): Json<GroupInput>,
) -> ApiResult<(StatusCode, Json<QuotationDetail>)> {
    let quotation = services::quotations::add_group(&app, &caller, &id, &phase_id, input).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

async fn update_group(
    State(app): State<App>,
    caller: CurrentUser,
    Path((id, group_id)): Path<(String, String)>,
    Json(input): Json<GroupInput>,
) -> Detail {
    services::quotations::update_group(&app, &caller, &id, &group_id, input)
        .await
        .map(Json)
}

async fn delete_group(
    State(app): State<App>,
    caller: CurrentUser,
    Path((id, group_id)): Path<(String, String)>,
) -> Detail {
    services::quotations::delete_group(&app, &caller, &id, &group_id)
        .await
        .map(Json)
}

async fn add_item(
    State(app): State<App>,
    caller: CurrentUser,
    Path((id, group_id)): Path<(String, String)>,
    Json(input): Json<ItemInput>,
) -> ApiResult<(StatusCode, Json<QuotationDetail>)> {
    let quotation = services::quotations::add_item(&app, &caller, &id, &group_id, input).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

async fn update_item(
    State(app): State<App>,
    caller: CurrentUser,
    Path((id, item_id)): Path<(String, String)>,
    Json(input): Json<ItemInput>,
) -> Detail {
    services::quotations::update_item(&app, &caller, &id, &item_id, input)
        .await
        .map(Json)
}

async fn delete_item(
    State(app): State<App>,
    caller: CurrentUser,
    Path((id, item_id)): Path<(String, String)>,
) -> Detail {
    services::quotations::delete_item(&app, &caller, &id, &item_id)
        .await
        .map(Json)
}
