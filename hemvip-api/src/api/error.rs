//! API error type
//!
//! Every failure leaves the service as an envelope with `success: false`.
//!
//! | Variant | Status |
//! |---|---|
//! | `Validation` | 400 |
//! | `NotFound`, `StudiesFull` | 404 |
//! | `Timeout` | 408 |
//! | `Conflict` | 409 |
//! | `PartialFailure` | 422 |
//! | `Internal` | 500 |

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Request,
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::any::Any;
use thiserror::Error;
use tracing::{error, warn};

use super::envelope::Envelope;
use crate::db::PageField;
use crate::study::StudyError;

/// One offending request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body, query, or identifier (400)
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    /// No matching study/page/video, or not owned by the caller (404)
    #[error("{0}")]
    NotFound(String),

    /// No study left to assign (404, `{state: "full"}`)
    #[error("All studies are complete")]
    StudiesFull,

    /// Request exceeded the configured timeout (408)
    #[error("Request timed out")]
    Timeout,

    /// Concurrent claim race lost (409)
    #[error("{0}")]
    Conflict(String),

    /// A page batch failed; nothing was written (422)
    #[error("Failed to update {batch} on pages")]
    PartialFailure {
        batch: PageField,
        failed_pages: Vec<i64>,
    },

    /// Unexpected fault (500)
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        ApiError::Validation {
            message: format!("Invalid request: {}", fields.join(", ")),
            errors,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::StudiesFull => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PartialFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn data(&self) -> Value {
        match self {
            ApiError::Validation { errors, .. } => json!({ "errors": errors }),
            ApiError::StudiesFull => json!({ "state": "full" }),
            ApiError::PartialFailure {
                batch,
                failed_pages,
            } => json!({ "batch": batch, "failed_pages": failed_pages }),
            _ => Value::Null,
        }
    }
}

impl From<StudyError> for ApiError {
    fn from(err: StudyError) -> Self {
        match err {
            StudyError::NoStudyAvailable => ApiError::StudiesFull,
            StudyError::AssignmentConflict { .. } => ApiError::Conflict(err.to_string()),
            StudyError::StudyNotFound(_)
            | StudyError::NoPagesFound(_)
            | StudyError::VideoNotFound { .. }
            | StudyError::OwnershipMismatch(_) => ApiError::NotFound(err.to_string()),
            StudyError::PartialCompletionFailure {
                batch,
                failed_pages,
            } => ApiError::PartialFailure {
                batch,
                failed_pages,
            },
            StudyError::Store(inner) => {
                error!("Store failure: {}", inner);
                ApiError::Internal(inner.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation {
            message: rejection.body_text(),
            errors: Vec::new(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation {
            message: rejection.body_text(),
            errors: Vec::new(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(Envelope::failure(self.data(), self.to_string()));
        (self.status(), body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Unknown route or method
pub async fn invalid_api() -> ApiError {
    ApiError::NotFound("Invalid api".to_string())
}

/// Replace the timeout layer's bare 408 with the error envelope
pub async fn envelope_timeout(request: Request, next: Next) -> Response {
    let uri = request.uri().clone();
    let response = next.run(request).await;
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        warn!("Request to {} timed out", uri);
        return ApiError::Timeout.into_response();
    }
    response
}

/// Convert a handler panic into a 500 envelope
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "An unknown error occurred".to_string()
    };

    error!("Handler panicked: {}", detail);
    ApiError::Internal(detail).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(StudyError::NoStudyAvailable).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StudyError::AssignmentConflict { attempts: 3 }).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(StudyError::OwnershipMismatch(1)).status(),
            StatusCode::NOT_FOUND
        );
        let partial = ApiError::from(StudyError::PartialCompletionFailure {
            batch: PageField::Selected,
            failed_pages: vec![9],
        });
        assert_eq!(partial.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(partial.data(), json!({"batch": "selected", "failed_pages": [9]}));
    }

    #[test]
    fn test_timeout_envelope() {
        let err = ApiError::Timeout;
        assert_eq!(err.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.to_string(), "Request timed out");
        assert_eq!(err.data(), Value::Null);
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = ApiError::validation(vec![
            FieldError {
                field: "prolificid",
                message: "Invalid PROLIFIC_PID format".to_string(),
            },
            FieldError {
                field: "sessionid",
                message: "sessionid is required".to_string(),
            },
        ]);
        assert_eq!(err.to_string(), "Invalid request: prolificid, sessionid");
        assert_eq!(err.data()["errors"][1]["field"], "sessionid");
    }
}
