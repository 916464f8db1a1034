use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::Json;
use crate::services::exports::{ExportMetadata, ExportRequest};
use crate::services::{self, App};

pub fn router() -> Router<App> {
    Router::new().route("/exports", post(export))
}

async fn export(
    State(app): State<App>,
    caller: CurrentUser,
    Json(request): Json<ExportRequest>,
) -> ApiResult<(StatusCode, Json<ExportMetadata>)> {
    let metadata = services::exports::export(&app, &caller, request).await?;
    Ok((StatusCode::CREATED, Json(metadata)))
}
