//! In-memory stand-ins for the store and every external platform.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sea_orm::DbErr;
use serde_json::Value;

use crate::db::entities::{agent, meeting};
use crate::db::enums::MeetingStatus;
use crate::db::services::{MeetingGuard, MeetingStore, MeetingUpdate};
use crate::services::{
    ChatMessage, ChatPlatform, ChatUser, CompletionMessage, CompletionService, JobQueue,
    RealtimeSession, ServiceError, VideoPlatform,
};
use crate::webhook::{Collaborators, ProcessorSettings, SignatureVerifier, WebhookProcessor};

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_API_SECRET: &str = "test-api-secret";

pub fn sample_meeting(id: &str, agent_id: &str, status: MeetingStatus) -> meeting::Model {
    let created = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
    meeting::Model {
        id: id.to_string(),
        name: format!("Meeting {id}"),
        user_id: "u1".to_string(),
        agent_id: agent_id.to_string(),
        status,
        started_at: None,
        ended_at: None,
        transcript_url: None,
        recording_url: None,
        summary: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn sample_agent(id: &str, name: &str, instructions: &str) -> agent::Model {
    let created = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
    agent::Model {
        id: id.to_string(),
        name: name.to_string(),
        user_id: "u1".to_string(),
        instructions: instructions.to_string(),
        created_at: created,
        updated_at: created,
    }
}

fn guard_matches(guard: &MeetingGuard, meeting: &meeting::Model) -> bool {
    guard.status.is_none_or(|s| meeting.status == s)
        && guard.user_id.as_deref().is_none_or(|u| meeting.user_id == u)
}

fn apply_update(update: MeetingUpdate, meeting: &mut meeting::Model) {
    if let Some(status) = update.status {
        meeting.status = status;
    }
    if let Some(started_at) = update.started_at {
        meeting.started_at = Some(started_at);
    }
    if let Some(ended_at) = update.ended_at {
        meeting.ended_at = Some(ended_at);
    }
    if let Some(url) = update.transcript_url {
        meeting.transcript_url = Some(url);
    }
    if let Some(url) = update.recording_url {
        meeting.recording_url = Some(url);
    }
    if let Some(summary) = update.summary {
        meeting.summary = Some(summary);
    }
    meeting.updated_at = Utc::now();
}

/// Applies guarded updates under one lock, the same all-or-nothing
/// behaviour the conditional `UPDATE` has in Postgres.
#[derive(Default)]
pub struct InMemoryMeetingStore {
    meetings: Mutex<HashMap<String, meeting::Model>>,
    agents: Mutex<HashMap<String, agent::Model>>,
}

impl InMemoryMeetingStore {
    pub fn insert_meeting(&self, meeting: meeting::Model) {
        self.meetings
            .lock()
            .unwrap()
            .insert(meeting.id.clone(), meeting);
    }

    pub fn insert_agent(&self, agent: agent::Model) {
        self.agents.lock().unwrap().insert(agent.id.clone(), agent);
    }

    pub fn meeting(&self, id: &str) -> Option<meeting::Model> {
        self.meetings.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl MeetingStore for InMemoryMeetingStore {
    async fn find_meeting(
        &self,
        meeting_id: &str,
        guard: MeetingGuard,
    ) -> Result<Option<meeting::Model>, DbErr> {
        Ok(self
            .meetings
            .lock()
            .unwrap()
            .get(meeting_id)
            .filter(|m| guard_matches(&guard, m))
            .cloned())
    }

    async fn update_meeting(
        &self,
        meeting_id: &str,
        guard: MeetingGuard,
        update: MeetingUpdate,
    ) -> Result<Option<meeting::Model>, DbErr> {
        let mut meetings = self.meetings.lock().unwrap();
        Ok(meetings
            .get_mut(meeting_id)
            .filter(|m| guard_matches(&guard, m))
            .map(|m| {
                apply_update(update, m);
                m.clone()
            }))
    }

    async fn find_agent(&self, agent_id: &str) -> Result<Option<agent::Model>, DbErr> {
        Ok(self.agents.lock().unwrap().get(agent_id).cloned())
    }
}

pub struct FakeVideoPlatform {
    verifier: SignatureVerifier,
    fail_connect: bool,
    ended: Mutex<Vec<String>>,
    connections: Mutex<Vec<(String, String, String)>>,
    instructions: Arc<Mutex<Vec<String>>>,
}

impl Default for FakeVideoPlatform {
    fn default() -> Self {
        Self {
            verifier: SignatureVerifier::new(TEST_API_SECRET),
            fail_connect: false,
            ended: Mutex::default(),
            connections: Mutex::default(),
            instructions: Arc::default(),
        }
    }
}

impl FakeVideoPlatform {
    pub fn failing_connect() -> Self {
        Self {
            fail_connect: true,
            ..Self::default()
        }
    }

    pub fn sign(&self, body: &[u8]) -> String {
        self.verifier.sign(body).unwrap()
    }

    /// `(call cid, agent user id, llm key)` per successful connect.
    pub fn connections(&self) -> Vec<(String, String, String)> {
        self.connections.lock().unwrap().clone()
    }

    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }

    pub fn ended_calls(&self) -> Vec<String> {
        self.ended.lock().unwrap().clone()
    }
}

struct RecordingSession {
    instructions: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl RealtimeSession for RecordingSession {
    async fn update_instructions(&self, instructions: &str) -> Result<(), ServiceError> {
        self.instructions
            .lock()
            .unwrap()
            .push(instructions.to_string());
        Ok(())
    }
}

#[async_trait]
impl VideoPlatform for FakeVideoPlatform {
    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        self.verifier.verify(body, signature)
    }

    async fn end_call(&self, call_type: &str, call_id: &str) -> Result<(), ServiceError> {
        self.ended
            .lock()
            .unwrap()
            .push(format!("{call_type}:{call_id}"));
        Ok(())
    }

    async fn connect_agent(
        &self,
        call_type: &str,
        call_id: &str,
        llm_api_key: &str,
        agent_user_id: &str,
    ) -> Result<Box<dyn RealtimeSession>, ServiceError> {
        if self.fail_connect {
            return Err(ServiceError::WebSocketError("bridge refused".to_string()));
        }
        self.connections.lock().unwrap().push((
            format!("{call_type}:{call_id}"),
            agent_user_id.to_string(),
            llm_api_key.to_string(),
        ));
        Ok(Box::new(RecordingSession {
            instructions: self.instructions.clone(),
        }))
    }
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel: String,
    pub text: String,
    pub author: ChatUser,
}

#[derive(Default)]
pub struct FakeChatPlatform {
    history: Vec<ChatMessage>,
    upserted: Mutex<Vec<ChatUser>>,
    sent: Mutex<Vec<SentMessage>>,
}

impl FakeChatPlatform {
    pub fn with_history(history: Vec<ChatMessage>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn upserted(&self) -> Vec<ChatUser> {
        self.upserted.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatform for FakeChatPlatform {
    async fn recent_messages(
        &self,
        _channel_type: &str,
        _channel_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ServiceError> {
        let start = self.history.len().saturating_sub(limit);
        Ok(self.history[start..].to_vec())
    }

    async fn upsert_user(&self, user: &ChatUser) -> Result<(), ServiceError> {
        self.upserted.lock().unwrap().push(user.clone());
        Ok(())
    }

    async fn send_message(
        &self,
        channel_type: &str,
        channel_id: &str,
        text: &str,
        author: &ChatUser,
    ) -> Result<(), ServiceError> {
        self.sent.lock().unwrap().push(SentMessage {
            channel: format!("{channel_type}:{channel_id}"),
            text: text.to_string(),
            author: author.clone(),
        });
        Ok(())
    }
}

pub struct ScriptedCompletions {
    reply: Option<String>,
    requests: Mutex<Vec<Vec<CompletionMessage>>>,
}

impl ScriptedCompletions {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            requests: Mutex::default(),
        }
    }

    pub fn empty() -> Self {
        Self {
            reply: None,
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<Vec<CompletionMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletions {
    async fn complete(
        &self,
        messages: &[CompletionMessage],
    ) -> Result<Option<String>, ServiceError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
pub struct RecordingJobQueue {
    fail: bool,
    sent: Mutex<Vec<(String, Value)>>,
}

impl RecordingJobQueue {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobQueue for RecordingJobQueue {
    async fn enqueue(&self, name: &str, data: Value) -> Result<(), ServiceError> {
        if self.fail {
            return Err(ServiceError::ApiError {
                service: "inngest",
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push((name.to_string(), data));
        Ok(())
    }
}

pub fn test_settings() -> ProcessorSettings {
    ProcessorSettings {
        api_key: TEST_API_KEY.to_string(),
        call_type: "default".to_string(),
        chat_channel_type: "messaging".to_string(),
        llm_api_key: "sk-test".to_string(),
        history_limit: ProcessorSettings::DEFAULT_HISTORY_LIMIT,
    }
}

pub fn processor_with(
    store: Arc<dyn MeetingStore>,
    video: Arc<dyn VideoPlatform>,
    chat: Arc<dyn ChatPlatform>,
    completions: Arc<dyn CompletionService>,
    jobs: Arc<dyn JobQueue>,
) -> WebhookProcessor {
    WebhookProcessor::new(
        test_settings(),
        Collaborators {
            store,
            video,
            chat,
            completions,
            jobs,
        },
    )
}
