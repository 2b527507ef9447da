//! API error types and responses.
//!
//! Every failed request answers with `{"error": {"code", "message", "details"?}}`
//! and never carries a `data` field.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lms_catalog::{CatalogError, FieldErrors};
use serde::Serialize;
use thiserror::Error;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Input that parsed but failed validation, with per-field reasons.
    #[error("{message}")]
    Validation {
        /// Summary of the rejected fields.
        message: String,
        /// Field name to reason.
        details: FieldErrors,
    },

    /// Request body over the configured size limit.
    #[error("request body too large")]
    PayloadTooLarge,

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<FieldErrors>,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Validation { .. } => "validation_failed",
            Self::PayloadTooLarge => "payload_too_large",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();
        let details = match self {
            Self::Validation { details, .. } => Some(details),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::Validation(details) => Self::Validation { message, details },
            CatalogError::CourseNotFound(id) => Self::NotFound(format!("course {id}")),
            CatalogError::Store(store_err) => {
                tracing::error!(error = %store_err, "Store error");
                Self::Internal("storage error".to_string())
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use lms_catalog::CourseId;
    use lms_store::StoreError;

    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::BadRequest("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("test".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("test".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_codes() {
        assert_eq!(ApiError::BadRequest("test".into()).code(), "bad_request");
        assert_eq!(ApiError::NotFound("test".into()).code(), "not_found");
        assert_eq!(ApiError::Internal("test".into()).code(), "internal_error");
    }

    #[test]
    fn catalog_errors_map_to_statuses() {
        let err = ApiError::from(CatalogError::invalid("min", "min must be a number"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        match err {
            ApiError::Validation { message, details } => {
                assert_eq!(message, "invalid input: min: min must be a number");
                assert_eq!(details["min"], "min must be a number");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = ApiError::from(CatalogError::CourseNotFound(CourseId::generate()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ApiError::from(CatalogError::Store(StoreError::Unavailable("down".into())));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "internal error: storage error");
    }
}
