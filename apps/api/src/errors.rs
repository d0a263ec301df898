use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::operations::OperationError;
use crate::persistence::PersistenceError;
use crate::schema::SchemaViolation;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(SchemaViolation),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<OperationError> for AppError {
    fn from(e: OperationError) -> Self {
        match e {
            OperationError::UnknownOperation(name) => {
                AppError::NotFound(format!("Unknown operation '{name}'"))
            }
            OperationError::InvalidInput(violation) => AppError::InvalidInput(violation),
            OperationError::Provider(msg) => AppError::Provider(msg),
            OperationError::MalformedOutput(msg) => AppError::MalformedOutput(msg),
            other @ (OperationError::Render(_) | OperationError::Serialization(_)) => {
                AppError::Internal(anyhow::Error::new(other))
            }
        }
    }
}

impl From<PersistenceError> for AppError {
    fn from(e: PersistenceError) -> Self {
        match e {
            PersistenceError::Unauthenticated(msg) => AppError::Unauthenticated(msg),
            PersistenceError::NotFound(msg) => AppError::NotFound(msg),
            PersistenceError::InvalidInput(msg) => AppError::Validation(msg),
            PersistenceError::Storage(msg) => AppError::Storage(msg),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String, Option<Value>) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::InvalidInput(violation) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                "The request does not match the expected input".to_string(),
                Some(json!(violation.issues)),
            ),
            AppError::Unauthenticated(msg) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                msg.clone(),
                None,
            ),
            AppError::Provider(msg) => {
                tracing::error!("AI provider error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_ERROR",
                    "The AI service is unavailable right now. Please try again.".to_string(),
                    None,
                )
            }
            AppError::MalformedOutput(msg) => {
                tracing::error!("Malformed AI output: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MALFORMED_OUTPUT",
                    "The AI service returned an unusable answer. Please try again.".to_string(),
                    None,
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    format!("A storage error occurred: {msg}"),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
