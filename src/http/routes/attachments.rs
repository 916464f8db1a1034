use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Path, Query};
use crate::models::Attachment;
use crate::services::attachments::{AttachmentFilter, AttachmentRequest};
use crate::services::{self, App, ListQuery, Page};

pub fn router() -> Router<App> {
    Router::new()
        .route("/attachments", get(list).post(upload))
        .route("/attachments/:id", get(fetch).delete(remove))
        .route("/attachments/:id/content", get(content))
}

async fn upload(
    State(app): State<App>,
    caller: CurrentUser,
    Json(request): Json<AttachmentRequest>,
) -> ApiResult<(StatusCode, Json<Attachment>)> {
    let attachment = services::attachments::upload(&app, &caller, request).await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(filter): Query<AttachmentFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<Attachment>>> {
    services::attachments::list(&app, &caller, filter, query)
        .await
        .map(Json)
}

async fn fetch(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Attachment>> {
    services::attachments::get(&app, &caller, &id).await.map(Json)
}

async fn content(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let (attachment, bytes) = services::attachments::content(&app, &caller, &id).await?;
    let content_type = HeaderValue::from_str(&attachment.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        attachment.file_name.replace('"', "")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn remove(
    State(app): State<App>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services::attachments::delete(&app, &caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
