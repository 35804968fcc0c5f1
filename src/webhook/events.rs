//! Inbound platform events.
//!
//! Parsing happens in two steps: any valid JSON is accepted and its `type`
//! inspected; only recognized types are then decoded into their typed shape,
//! and a recognized type with the wrong shape is rejected. Unrecognized types
//! are acknowledged without action so the sender does not retry them.

use serde::Deserialize;
use serde_json::Value;

use super::error::WebhookError;

pub const SESSION_STARTED: &str = "call.session_started";
pub const PARTICIPANT_LEFT: &str = "call.session_participant_left";
pub const SESSION_ENDED: &str = "call.session_ended";
pub const TRANSCRIPTION_READY: &str = "call.transcription_ready";
pub const RECORDING_READY: &str = "call.recording_ready";
pub const MESSAGE_NEW: &str = "message.new";

const RECOGNIZED_TYPES: [&str; 6] = [
    SESSION_STARTED,
    PARTICIPANT_LEFT,
    SESSION_ENDED,
    TRANSCRIPTION_READY,
    RECORDING_READY,
    MESSAGE_NEW,
];

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawEvent {
    #[serde(rename = "call.session_started")]
    SessionStarted { call: CallPayload },
    #[serde(rename = "call.session_participant_left")]
    ParticipantLeft { call_cid: Option<String> },
    #[serde(rename = "call.session_ended")]
    SessionEnded { call: CallPayload },
    #[serde(rename = "call.transcription_ready")]
    TranscriptionReady {
        call_cid: Option<String>,
        call_transcription: AssetPayload,
    },
    #[serde(rename = "call.recording_ready")]
    RecordingReady {
        call_cid: Option<String>,
        call_recording: AssetPayload,
    },
    #[serde(rename = "message.new")]
    MessageNew {
        channel_id: Option<String>,
        message: Option<MessagePayload>,
        user: Option<UserPayload>,
    },
}

#[derive(Debug, Deserialize)]
struct CallPayload {
    custom: Option<CallCustom>,
}

#[derive(Debug, Deserialize)]
struct CallCustom {
    #[serde(rename = "meetingId")]
    meeting_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssetPayload {
    url: String,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    cid: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: Option<String>,
}

/// A chat message posted into a meeting's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub meeting_id: String,
    pub user_id: String,
    pub channel_id: String,
    pub text: String,
}

/// A validated event carrying everything its handler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingEvent {
    SessionStarted { meeting_id: String },
    ParticipantLeft { meeting_id: String },
    SessionEnded { meeting_id: String },
    TranscriptionReady { meeting_id: String, transcript_url: String },
    RecordingReady { meeting_id: String, recording_url: String },
    MessageNew(NewMessage),
    Unrecognized { event_type: String },
}

impl MeetingEvent {
    pub fn event_type(&self) -> &str {
        match self {
            MeetingEvent::SessionStarted { .. } => SESSION_STARTED,
            MeetingEvent::ParticipantLeft { .. } => PARTICIPANT_LEFT,
            MeetingEvent::SessionEnded { .. } => SESSION_ENDED,
            MeetingEvent::TranscriptionReady { .. } => TRANSCRIPTION_READY,
            MeetingEvent::RecordingReady { .. } => RECORDING_READY,
            MeetingEvent::MessageNew(_) => MESSAGE_NEW,
            MeetingEvent::Unrecognized { event_type } => event_type.as_str(),
        }
    }
}

/// Extracts the id half of a `namespace:id` cid.
pub fn id_from_cid(cid: &str) -> Option<&str> {
    cid.split(':').nth(1).filter(|id| !id.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn meeting_id_from_call(call: CallPayload) -> Result<String, WebhookError> {
    non_empty(call.custom.and_then(|c| c.meeting_id)).ok_or(WebhookError::MissingMeetingId)
}

fn meeting_id_from_cid(call_cid: Option<String>) -> Result<String, WebhookError> {
    call_cid
        .as_deref()
        .and_then(id_from_cid)
        .map(str::to_string)
        .ok_or(WebhookError::MissingMeetingId)
}

pub fn parse_event(body: &[u8]) -> Result<MeetingEvent, WebhookError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    let event_type = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !RECOGNIZED_TYPES.contains(&event_type) {
        return Ok(MeetingEvent::Unrecognized {
            event_type: event_type.to_string(),
        });
    }

    let raw: RawEvent = serde_json::from_value(value)
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    let event = match raw {
        RawEvent::SessionStarted { call } => MeetingEvent::SessionStarted {
            meeting_id: meeting_id_from_call(call)?,
        },
        RawEvent::ParticipantLeft { call_cid } => MeetingEvent::ParticipantLeft {
            meeting_id: meeting_id_from_cid(call_cid)?,
        },
        RawEvent::SessionEnded { call } => MeetingEvent::SessionEnded {
            meeting_id: meeting_id_from_call(call)?,
        },
        RawEvent::TranscriptionReady {
            call_cid,
            call_transcription,
        } => MeetingEvent::TranscriptionReady {
            meeting_id: meeting_id_from_cid(call_cid)?,
            transcript_url: call_transcription.url,
        },
        RawEvent::RecordingReady {
            call_cid,
            call_recording,
        } => MeetingEvent::RecordingReady {
            meeting_id: meeting_id_from_cid(call_cid)?,
            recording_url: call_recording.url,
        },
        RawEvent::MessageNew {
            channel_id,
            message,
            user,
        } => {
            let (cid, text) = message.map(|m| (m.cid, m.text)).unwrap_or_default();
            let meeting_id = cid.as_deref().and_then(id_from_cid).map(str::to_string);
            match (
                meeting_id,
                non_empty(user.and_then(|u| u.id)),
                non_empty(channel_id),
                non_empty(text),
            ) {
                (Some(meeting_id), Some(user_id), Some(channel_id), Some(text)) => {
                    MeetingEvent::MessageNew(NewMessage {
                        meeting_id,
                        user_id,
                        channel_id,
                        text,
                    })
                }
                _ => return Err(WebhookError::MissingFields),
            }
        }
    };
    Ok(event)
}
