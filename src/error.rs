// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::{ValidationErrors, ValidationErrorsKind};

/// A stored document the dashboard cannot use as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("{collection}/{id}: missing required field `{field}`")]
    MissingField {
        collection: &'static str,
        id: String,
        field: &'static str,
    },

    /// The document did not decode at all.
    #[error("{collection}/{id}: {reason}")]
    Malformed {
        collection: &'static str,
        id: String,
        reason: String,
    },
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn invalid_fields(errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(_) => out.push(field.to_string()),
            ValidationErrorsKind::Struct(inner) => invalid_fields(inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    invalid_fields(inner, out);
                }
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        invalid_fields(&errors, &mut fields);
        fields.sort_unstable();
        fields.dedup();
        AppError::Validation(format!("Please fill in all fields: {}", fields.join(", ")))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                Some(msg.clone()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Geocoding(msg) => {
                (StatusCode::BAD_GATEWAY, "geocoding_error", Some(msg.clone()))
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::BAD_GATEWAY, "storage_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Schema(err) => {
                tracing::error!(error = %err, "Schema error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "schema_error",
                    Some(err.to_string()),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
