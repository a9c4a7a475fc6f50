// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Application error types with consistent API responses.

use crate::models::Enrollment;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Application error type that converts to HTTP responses.
///
/// Conflicts carry their own variant so callers can branch on them
/// instead of inspecting message text.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Student is already enrolled in activity {}", .0.activity_id)]
    AlreadyEnrolled(Box<Enrollment>),

    #[error("Activity is closed: {reason}")]
    ActivityClosed { reason: String },

    #[error("Activity is already closed")]
    AlreadyClosed,

    #[error("Activity is still referenced: {0}")]
    ActivityInUse(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure for a single field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// A conflict the client should render as success ("you are enrolled").
    pub fn is_soft_conflict(&self) -> bool {
        matches!(self, AppError::AlreadyEnrolled(_))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        match first_invalid_field(&errors, "") {
            Some((field, message)) => AppError::Validation { field, message },
            None => AppError::BadRequest("Invalid input".to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Walk validator output in a stable (alphabetical) order and report the first failure.
fn first_invalid_field(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                if let Some(err) = field_errors.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", err.code));
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_invalid_field(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    let item_path = format!("{}[{}]", path, index);
                    if let Some(found) = first_invalid_field(inner, &item_path) {
                        return Some(found);
                    }
                }
            }
        }
    }

    None
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enrollment: Option<Enrollment>,
}

impl ErrorResponse {
    fn new(error: &str, details: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            details,
            field: None,
            reason: None,
            enrollment: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("unauthorized", None),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("invalid_token", None),
            ),
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, ErrorResponse::new("forbidden", Some(msg)))
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("not_found", Some(msg)))
            }
            AppError::Validation { field, message } => {
                let mut body = ErrorResponse::new("validation_error", Some(message));
                body.field = Some(field);
                (StatusCode::BAD_REQUEST, body)
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new("bad_request", Some(msg)))
            }
            AppError::AlreadyEnrolled(enrollment) => {
                let mut body = ErrorResponse::new(
                    "already_enrolled",
                    Some("Student is already enrolled in this activity".to_string()),
                );
                body.enrollment = Some(*enrollment);
                (StatusCode::CONFLICT, body)
            }
            AppError::ActivityClosed { reason } => {
                let mut body = ErrorResponse::new(
                    "activity_closed",
                    Some(format!("Activity is closed: {}", reason)),
                );
                body.reason = Some(reason);
                (StatusCode::CONFLICT, body)
            }
            AppError::AlreadyClosed => (
                StatusCode::CONFLICT,
                ErrorResponse::new(
                    "already_closed",
                    Some("Activity is already closed".to_string()),
                ),
            ),
            AppError::ActivityInUse(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("activity_in_use", Some(msg)),
            ),
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorResponse::new("conflict", Some(msg)))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("database_error", None),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal_error", None),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;
