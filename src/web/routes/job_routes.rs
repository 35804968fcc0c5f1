use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, header::AUTHORIZATION},
    routing::post,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::db::entities::meeting;
use crate::web::{AppError, AppState};

#[derive(Deserialize)]
pub struct CompleteMeetingRequest {
    summary: String,
}

fn check_bearer(headers: &HeaderMap, secret: Option<&str>) -> Result<(), AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match (token, secret) {
        (Some(token), Some(secret)) if token == secret => Ok(()),
        _ => Err(AppError::Unauthorized("Invalid job token".to_string())),
    }
}

async fn complete_meeting_handler(
    State(app_state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<meeting::Model>, AppError> {
    check_bearer(&headers, app_state.job_callback_secret.as_deref())?;
    let payload: CompleteMeetingRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid completion payload: {e}")))?;
    let meeting = app_state
        .processor
        .complete_meeting(&meeting_id, &payload.summary)
        .await?;
    Ok(Json(meeting))
}

pub fn create_job_router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/meetings/{meeting_id}/completed",
        post(complete_meeting_handler),
    )
}
