// src/error.rs

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::storage::StorageError;

/// One entry of a field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Flattens `validator` output into a stable, field-sorted list.
/// Struct-level checks are reported under the field `__all__`.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    out.push(FieldError {
                        field: field.to_string(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(_) | ValidationErrorsKind::List(_) => {
                out.push(FieldError {
                    field: field.to_string(),
                    message: "invalid".to_string(),
                });
            }
        }
    }
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    out
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 400 Bad Request with a field-level error list
    Validation(Vec<FieldError>),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    Vec::new(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Vec::new()),
            AppError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                details,
            ),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg, Vec::new()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, Vec::new()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, Vec::new()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, Vec::new()),
        };

        let body = if details.is_empty() {
            Json(json!({ "error": error_message }))
        } else {
            Json(json!({ "error": error_message, "details": details }))
        };

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Unreadable request bodies are reported like any other invalid input.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![FieldError {
            field: "body".to_string(),
            message: rejection.body_text(),
        }])
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(field_errors(&errors))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            StorageError::Conflict(msg) => AppError::Conflict(msg),
            StorageError::Database(msg) => AppError::InternalServerError(msg),
        }
    }
}
