use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;
use crate::workflows::TransitionError;

/// One failed field check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Accumulates field errors so a request reports every problem at once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// `Ok(())` when nothing was recorded, otherwise a 422
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },
    #[error("{0}")]
    Conflict(String),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    TooManyRequests(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => ApiError::not_found(entity, &id),
            StoreError::UniqueViolation { .. } | StoreError::DuplicateId { .. } => {
                ApiError::Conflict(err.to_string())
            }
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::MissingReason => ApiError::invalid("reason", err.to_string()),
            TransitionError::EmptyQuotation => ApiError::invalid("items", err.to_string()),
            TransitionError::ChecklistIncomplete { ref missing, .. } => ApiError::Validation(
                missing
                    .iter()
                    .map(|item| FieldError {
                        field: format!("qualification.{item}"),
                        message: "must be completed before advancing".to_string(),
                    })
                    .collect(),
            ),
            TransitionError::OverrideNotAllowed => ApiError::Forbidden(err.to_string()),
            _ => ApiError::Conflict(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    detail: String,
    #[serde(skip_serializing_if = "no_field_errors")]
    errors: &'a [FieldError],
}

fn no_field_errors(errors: &&[FieldError]) -> bool {
    errors.is_empty()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            ApiError::Internal(e) => {
                error!(error = %e, "Request failed with internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let errors: &[FieldError] = match &self {
            ApiError::Validation(errors) => errors,
            _ => &[],
        };
        (status, Json(ErrorBody { detail, errors })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_http_semantics() {
        let not_found: ApiError = StoreError::NotFound {
            entity: "Lead",
            id: "x".to_string(),
        }
        .into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict: ApiError = StoreError::UniqueViolation {
            collection: "companies".to_string(),
            fields: "gst_number".to_string(),
        }
        .into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert!(conflict.to_string().contains("gst_number"));

        let backend: ApiError = StoreError::Backend("disk full".to_string()).into();
        assert_eq!(backend.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_errors_collect_every_failure() {
        let mut errors = ValidationErrors::new();
        errors.check(false, "name", "is required");
        errors.check(true, "email", "is invalid");
        errors.check(false, "pan_number", "is invalid");
        match errors.finish() {
            Err(ApiError::Validation(fields)) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[1].field, "pan_number");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
