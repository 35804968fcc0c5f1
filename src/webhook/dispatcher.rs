use std::sync::Arc;

use chrono::Utc;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use super::agent_connection::connect_agent;
use super::assistant::AssistantBridge;
use super::error::WebhookError;
use super::events::{MeetingEvent, parse_event};
use super::lifecycle;
use crate::db::entities::meeting;
use crate::db::services::MeetingStore;
use crate::services::{ChatPlatform, CompletionService, JobQueue, VideoPlatform};

/// What a delivery did to stored state. Every variant is acknowledged with
/// `{"status":"ok"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied,
    /// Recognized but nothing matched, e.g. a session end for a meeting that
    /// is no longer active.
    Unchanged,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub api_key: String,
    pub call_type: String,
    pub chat_channel_type: String,
    pub llm_api_key: String,
    pub history_limit: usize,
}

impl ProcessorSettings {
    pub const DEFAULT_HISTORY_LIMIT: usize = 5;
}

#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn MeetingStore>,
    pub video: Arc<dyn VideoPlatform>,
    pub chat: Arc<dyn ChatPlatform>,
    pub completions: Arc<dyn CompletionService>,
    pub jobs: Arc<dyn JobQueue>,
}

pub struct WebhookProcessor {
    settings: ProcessorSettings,
    deps: Collaborators,
}

impl WebhookProcessor {
    pub fn new(settings: ProcessorSettings, deps: Collaborators) -> Self {
        Self { settings, deps }
    }

    /// Checks the delivery headers before the body is looked at.
    pub fn authenticate(
        &self,
        signature: Option<&str>,
        api_key: Option<&str>,
        body: &[u8],
    ) -> Result<(), WebhookError> {
        let (Some(signature), Some(api_key)) = (
            signature.filter(|s| !s.is_empty()),
            api_key.filter(|k| !k.is_empty()),
        ) else {
            return Err(WebhookError::MissingCredentials);
        };

        if !self.deps.video.verify_webhook(body, signature) {
            warn!("Rejected webhook with an invalid signature.");
            return Err(WebhookError::InvalidSignature);
        }
        if api_key != self.settings.api_key {
            warn!("Rejected webhook with a foreign API key.");
            return Err(WebhookError::InvalidApiKey);
        }
        Ok(())
    }

    /// Parses an authenticated body and runs the handler for its event type.
    pub async fn process(&self, body: &[u8]) -> Result<WebhookOutcome, WebhookError> {
        let event = parse_event(body)?;
        let span = info_span!(
            "webhook",
            delivery_id = %Uuid::new_v4(),
            event_type = %event.event_type(),
        );
        self.dispatch(event).instrument(span).await
    }

    async fn dispatch(&self, event: MeetingEvent) -> Result<WebhookOutcome, WebhookError> {
        let store = self.deps.store.as_ref();
        match event {
            MeetingEvent::SessionStarted { meeting_id } => {
                let meeting = lifecycle::start_session(store, &meeting_id, Utc::now()).await?;
                connect_agent(
                    store,
                    self.deps.video.as_ref(),
                    &self.settings.call_type,
                    &self.settings.llm_api_key,
                    &meeting,
                )
                .await?;
                Ok(WebhookOutcome::Applied)
            }
            MeetingEvent::ParticipantLeft { meeting_id } => {
                self.deps
                    .video
                    .end_call(&self.settings.call_type, &meeting_id)
                    .await?;
                debug!(meeting_id = %meeting_id, "Call ended after participant left.");
                Ok(WebhookOutcome::Applied)
            }
            MeetingEvent::SessionEnded { meeting_id } => {
                let ended = lifecycle::end_session(store, &meeting_id, Utc::now()).await?;
                Ok(applied_if(ended.is_some()))
            }
            MeetingEvent::TranscriptionReady {
                meeting_id,
                transcript_url,
            } => {
                lifecycle::attach_transcript(
                    store,
                    self.deps.jobs.as_ref(),
                    &meeting_id,
                    &transcript_url,
                )
                .await?;
                Ok(WebhookOutcome::Applied)
            }
            MeetingEvent::RecordingReady {
                meeting_id,
                recording_url,
            } => {
                let updated =
                    lifecycle::attach_recording(store, &meeting_id, &recording_url).await?;
                Ok(applied_if(updated.is_some()))
            }
            MeetingEvent::MessageNew(message) => {
                AssistantBridge {
                    store,
                    chat: self.deps.chat.as_ref(),
                    completions: self.deps.completions.as_ref(),
                    channel_type: &self.settings.chat_channel_type,
                    history_limit: self.settings.history_limit,
                }
                .answer(&message)
                .await
            }
            MeetingEvent::Unrecognized { event_type } => {
                debug!(event_type = %event_type, "Acknowledging unhandled event type.");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// Called by the summarization job once a summary exists.
    pub async fn complete_meeting(
        &self,
        meeting_id: &str,
        summary: &str,
    ) -> Result<meeting::Model, WebhookError> {
        lifecycle::complete_processing(self.deps.store.as_ref(), meeting_id, summary).await
    }

    pub async fn cancel_meeting(
        &self,
        meeting_id: &str,
        user_id: &str,
    ) -> Result<meeting::Model, WebhookError> {
        lifecycle::cancel(self.deps.store.as_ref(), meeting_id, user_id).await
    }
}

fn applied_if(matched: bool) -> WebhookOutcome {
    if matched {
        WebhookOutcome::Applied
    } else {
        WebhookOutcome::Unchanged
    }
}
