use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth::{parse_bearer, CurrentUser};
use crate::error::{ApiError, FieldError};
use crate::observability::api_metrics;
use crate::services::{self, App};

/// JSON body extractor whose rejections render as `ApiError`.
/// Also usable as a response, so handlers keep a single `Json` in scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

/// Query-string extractor whose rejections render as `ApiError`
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

/// Path-parameter extractor whose rejections render as `ApiError`
#[derive(Debug, Clone, Copy, Default)]
pub struct Path<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    axum::extract::Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    axum::extract::Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let error = describe_data_error(&err.body_text());
                ApiError::Validation(vec![error])
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        let mut error = describe_data_error(&rejection.body_text());
        if error.field == "body" {
            error.field = "query".to_string();
        }
        ApiError::Validation(vec![error])
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Turns a serde message such as
/// ``Failed to deserialize ...: expected_value: invalid type ... at line 1 column 9``
/// into a field error naming the offending field.
fn describe_data_error(text: &str) -> FieldError {
    let detail = text
        .split_once("target type: ")
        .or_else(|| text.split_once("query string: "))
        .map_or(text, |(_, rest)| rest);
    let detail = detail.split(" at line ").next().unwrap_or(detail).trim();

    if let Some(rest) = detail.strip_prefix("missing field `") {
        let field = rest.split('`').next().unwrap_or_default();
        return FieldError {
            field: field.to_string(),
            message: "is required".to_string(),
        };
    }
    match detail.split_once(": ") {
        Some((path, reason)) if !path.is_empty() && !path.contains(' ') => FieldError {
            field: path.to_string(),
            message: reason.to_string(),
        },
        _ => FieldError {
            field: "body".to_string(),
            message: detail.to_string(),
        },
    }
}

#[axum::async_trait]
impl FromRequestParts<App> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, app: &App) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let Some(token) = header.and_then(parse_bearer) else {
            api_metrics().record_auth_failure();
            return Err(ApiError::Unauthorized(
                "missing or malformed bearer token".to_string(),
            ));
        };

        let caller = services::auth::authenticate(app, token).await?;
        tracing::Span::current().record("user.id", caller.id());
        Ok(caller)
    }
}
