use std::sync::Arc;

use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use bytes::Bytes;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::web::{AppError, AppState};
use crate::webhook::WebhookError;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const API_KEY_HEADER: &str = "x-api-key";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn log_rejection(err: &WebhookError) {
    match err {
        WebhookError::NoCompletion
        | WebhookError::EnqueueFailed { .. }
        | WebhookError::UpstreamError(_)
        | WebhookError::DatabaseError(_) => error!(error = %err, "Webhook delivery failed."),
        WebhookError::MeetingNotFound(_) | WebhookError::AgentNotFound => {
            debug!(error = %err, "Webhook delivery matched no meeting.")
        }
        _ => warn!(error = %err, "Webhook delivery rejected."),
    }
}

async fn webhook_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let processor = &app_state.processor;
    let result = async {
        processor.authenticate(
            header_str(&headers, SIGNATURE_HEADER),
            header_str(&headers, API_KEY_HEADER),
            &body,
        )?;
        processor.process(&body).await
    }
    .await;

    match result {
        Ok(outcome) => {
            debug!(?outcome, "Webhook acknowledged.");
            Ok(Json(json!({ "status": "ok" })))
        }
        Err(err) => {
            log_rejection(&err);
            Err(err.into())
        }
    }
}

pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/webhook", post(webhook_handler))
}
