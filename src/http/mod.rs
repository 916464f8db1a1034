// HTTP surface: router assembly, request tracing and the bearer-token extractor.

mod extract;
pub mod routes;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::{from_fn, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::observability::{api_metrics, ApiStats};
use crate::services::App;
use crate::telemetry::{create_request_span, generate_correlation_id};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Full application router with every resource mounted under `/api`
pub fn build_router(app: App) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::roles::router())
        .merge(routes::master_data::router())
        .merge(routes::companies::router())
        .merge(routes::partners::router())
        .merge(routes::leads::router())
        .merge(routes::opportunities::router())
        .merge(routes::quotations::router())
        .merge(routes::services::router())
        .merge(routes::activity::router())
        .merge(routes::attachments::router())
        .merge(routes::exports::router());

    let cors = if app.config.server.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };
    // base64 inflates uploads by a third
    let body_limit = app.config.uploads.max_upload_bytes / 3 * 4 + 64 * 1024;

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(request_tracing))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app)
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(generate_correlation_id)
}

async fn request_tracing(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers());
    let span = create_request_span(&method, &path, &request_id);

    api_metrics().record_request();
    let mut response = next.run(request).instrument(span).await;
    api_metrics().record_status(response.status().as_u16());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    metrics: ApiStats,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        metrics: api_metrics().get_stats(),
    })
}
