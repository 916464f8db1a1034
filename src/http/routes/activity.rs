use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::http::extract::{Json, Query};
use crate::models::ActivityLog;
use crate::services::activity::ActivityFilter;
use crate::services::{self, App, ListQuery, Page};

pub fn router() -> Router<App> {
    Router::new().route("/activity", get(list))
}

async fn list(
    State(app): State<App>,
    caller: CurrentUser,
    Query(filter): Query<ActivityFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<ActivityLog>>> {
    services::activity::list(&app, &caller, filter, query)
        .await
        .map(Json)
}
