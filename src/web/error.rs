use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::webhook::WebhookError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {msg}"),
            ),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        let msg = err.to_string();
        match err {
            WebhookError::MissingCredentials
            | WebhookError::MalformedPayload(_)
            | WebhookError::MissingMeetingId
            | WebhookError::MissingFields => AppError::InvalidInput(msg),
            WebhookError::InvalidSignature | WebhookError::InvalidApiKey => {
                AppError::Unauthorized(msg)
            }
            WebhookError::MeetingNotFound(_) | WebhookError::AgentNotFound => {
                AppError::NotFound(msg)
            }
            WebhookError::DatabaseError(e) => AppError::DatabaseError(e.to_string()),
            WebhookError::NoCompletion
            | WebhookError::EnqueueFailed { .. }
            | WebhookError::UpstreamError(_) => AppError::InternalServerError(msg),
        }
    }
}
