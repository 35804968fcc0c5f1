//! Meeting status transitions.
//!
//! Every transition is one conditional update keyed on the meeting id and the
//! expected current status. Whoever's update matches owns the transition;
//! a concurrent or repeated delivery matches no row and is turned away before
//! any side effect runs.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use super::error::WebhookError;
use crate::db::entities::meeting;
use crate::db::enums::MeetingStatus;
use crate::db::services::{MeetingGuard, MeetingStore, MeetingUpdate};
use crate::services::JobQueue;

pub const MEETINGS_PROCESSING_JOB: &str = "meetings/processing";

async fn transition(
    store: &dyn MeetingStore,
    meeting_id: &str,
    guard: MeetingGuard,
    to: MeetingStatus,
    mut update: MeetingUpdate,
) -> Result<Option<meeting::Model>, WebhookError> {
    debug_assert!(guard.status.is_some_and(|from| from.can_transition_to(to)));
    update.status = Some(to);
    Ok(store.update_meeting(meeting_id, guard, update).await?)
}

/// `upcoming -> active`, stamping `started_at`.
pub async fn start_session(
    store: &dyn MeetingStore,
    meeting_id: &str,
    now: DateTime<Utc>,
) -> Result<meeting::Model, WebhookError> {
    let started = transition(
        store,
        meeting_id,
        MeetingGuard::with_status(MeetingStatus::Upcoming),
        MeetingStatus::Active,
        MeetingUpdate {
            started_at: Some(now),
            ..Default::default()
        },
    )
    .await?;

    match started {
        Some(meeting) => {
            info!(meeting_id, "Meeting is now active.");
            Ok(meeting)
        }
        None => {
            info!(meeting_id, "Session start ignored: meeting missing or already started.");
            Err(WebhookError::MeetingNotFound(
                "Meeting not found or already completed",
            ))
        }
    }
}

/// `active -> processing`, stamping `ended_at`. Any other status is left
/// alone and reported as `None`.
pub async fn end_session(
    store: &dyn MeetingStore,
    meeting_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<meeting::Model>, WebhookError> {
    let ended = transition(
        store,
        meeting_id,
        MeetingGuard::with_status(MeetingStatus::Active),
        MeetingStatus::Processing,
        MeetingUpdate {
            ended_at: Some(now),
            ..Default::default()
        },
    )
    .await?;

    match &ended {
        Some(_) => info!(meeting_id, "Meeting moved to processing."),
        None => info!(meeting_id, "Session end ignored: meeting is not active."),
    }
    Ok(ended)
}

/// Stores the transcript URL and queues summarization. The job is only queued
/// once the URL is persisted; a queue failure is returned so the sender
/// redelivers the event.
pub async fn attach_transcript(
    store: &dyn MeetingStore,
    jobs: &dyn JobQueue,
    meeting_id: &str,
    transcript_url: &str,
) -> Result<meeting::Model, WebhookError> {
    let meeting = store
        .update_meeting(
            meeting_id,
            MeetingGuard::any(),
            MeetingUpdate {
                transcript_url: Some(transcript_url.to_string()),
                ..Default::default()
            },
        )
        .await?
        .ok_or(WebhookError::MeetingNotFound(
            "Meeting not found or already processed",
        ))?;

    let data = json!({
        "meetingId": meeting.id,
        "transcriptUrl": transcript_url,
    });
    jobs.enqueue(MEETINGS_PROCESSING_JOB, data)
        .await
        .map_err(|source| WebhookError::EnqueueFailed {
            job: MEETINGS_PROCESSING_JOB,
            source,
        })?;

    info!(meeting_id, "Transcript stored and processing job queued.");
    Ok(meeting)
}

pub async fn attach_recording(
    store: &dyn MeetingStore,
    meeting_id: &str,
    recording_url: &str,
) -> Result<Option<meeting::Model>, WebhookError> {
    let updated = store
        .update_meeting(
            meeting_id,
            MeetingGuard::any(),
            MeetingUpdate {
                recording_url: Some(recording_url.to_string()),
                ..Default::default()
            },
        )
        .await?;
    match &updated {
        Some(_) => info!(meeting_id, "Recording stored."),
        None => warn!(meeting_id, "Recording ready for an unknown meeting."),
    }
    Ok(updated)
}

/// `processing -> completed`, reported by the summarization job.
pub async fn complete_processing(
    store: &dyn MeetingStore,
    meeting_id: &str,
    summary: &str,
) -> Result<meeting::Model, WebhookError> {
    transition(
        store,
        meeting_id,
        MeetingGuard::with_status(MeetingStatus::Processing),
        MeetingStatus::Completed,
        MeetingUpdate {
            summary: Some(summary.to_string()),
            ..Default::default()
        },
    )
    .await?
    .inspect(|_| info!(meeting_id, "Meeting completed."))
    .ok_or(WebhookError::MeetingNotFound(
        "Meeting not found or not processing",
    ))
}

/// `upcoming -> cancelled`, only for the meeting's owner.
pub async fn cancel(
    store: &dyn MeetingStore,
    meeting_id: &str,
    user_id: &str,
) -> Result<meeting::Model, WebhookError> {
    transition(
        store,
        meeting_id,
        MeetingGuard::with_status(MeetingStatus::Upcoming).owned_by(user_id),
        MeetingStatus::Cancelled,
        MeetingUpdate::default(),
    )
    .await?
    .inspect(|_| info!(meeting_id, "Meeting cancelled."))
    .ok_or(WebhookError::MeetingNotFound(
        "Meeting not found or already started",
    ))
}
