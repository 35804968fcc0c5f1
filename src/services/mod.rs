//! Clients for the platforms the webhook core talks to.
//!
//! Each collaborator sits behind a trait so the handler can be driven by the
//! real Stream/OpenAI/Inngest clients in production and by fakes in tests.

use async_trait::async_trait;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod avatar;
pub mod inngest;
pub mod openai;
pub mod stream_auth;
pub mod stream_chat;
pub mod stream_video;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("{service} returned status {status}: {body}")]
    ApiError {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("Token creation failed: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),
    #[error("WebSocket error: {0}")]
    WebSocketError(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Realtime session is closed")]
    SessionClosed,
}

/// Turns a non-2xx response into [`ServiceError::ApiError`], keeping the body
/// for the logs.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: Response,
) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    Err(ServiceError::ApiError {
        service,
        status: status.as_u16(),
        body,
    })
}

/// A message as stored in a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub user_id: Option<String>,
    pub text: Option<String>,
}

/// Identity a message is posted under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: CompletionRole,
    pub content: String,
}

impl CompletionMessage {
    pub fn new(role: CompletionRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait VideoPlatform: Send + Sync {
    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool;

    async fn end_call(&self, call_type: &str, call_id: &str) -> Result<(), ServiceError>;

    /// Attaches an LLM realtime session to the call, speaking as
    /// `agent_user_id`.
    async fn connect_agent(
        &self,
        call_type: &str,
        call_id: &str,
        llm_api_key: &str,
        agent_user_id: &str,
    ) -> Result<Box<dyn RealtimeSession>, ServiceError>;
}

#[async_trait]
pub trait RealtimeSession: Send + Sync {
    async fn update_instructions(&self, instructions: &str) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The newest `limit` messages of the channel, oldest first.
    async fn recent_messages(
        &self,
        channel_type: &str,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ServiceError>;

    async fn upsert_user(&self, user: &ChatUser) -> Result<(), ServiceError>;

    async fn send_message(
        &self,
        channel_type: &str,
        channel_id: &str,
        text: &str,
        author: &ChatUser,
    ) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the first choice's text, or `None` when the model produced none.
    async fn complete(
        &self,
        messages: &[CompletionMessage],
    ) -> Result<Option<String>, ServiceError>;
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, name: &str, data: serde_json::Value) -> Result<(), ServiceError>;
}
