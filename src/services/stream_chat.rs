use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

use super::stream_auth::StreamCredentials;
use super::{ChatMessage, ChatPlatform, ChatUser, ServiceError, ensure_success};

const SERVICE: &str = "stream-chat";

/// Stream Chat server-side client.
pub struct StreamChatClient {
    client: Client,
    base_url: String,
    credentials: StreamCredentials,
}

#[derive(Debug, Deserialize)]
struct ChannelStateResponse {
    #[serde(default)]
    messages: Vec<StreamMessage>,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    text: Option<String>,
    user: Option<StreamUserRef>,
}

#[derive(Debug, Deserialize)]
struct StreamUserRef {
    id: String,
}

impl From<StreamMessage> for ChatMessage {
    fn from(message: StreamMessage) -> Self {
        ChatMessage {
            user_id: message.user.map(|u| u.id),
            text: message.text,
        }
    }
}

impl StreamChatClient {
    pub fn new(base_url: impl Into<String>, credentials: StreamCredentials) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}?api_key={}",
            self.base_url,
            path,
            urlencoding::encode(self.credentials.api_key())
        )
    }

    fn channel_path(channel_type: &str, channel_id: &str, action: &str) -> String {
        format!(
            "/channels/{}/{}/{}",
            urlencoding::encode(channel_type),
            urlencoding::encode(channel_id),
            action
        )
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, ServiceError> {
        let token = self.credentials.server_token()?;
        let response = self
            .client
            .post(self.url(path))
            .header("Authorization", token)
            .header("stream-auth-type", "jwt")
            .json(&body)
            .send()
            .await?;
        ensure_success(SERVICE, response).await
    }
}

#[async_trait]
impl ChatPlatform for StreamChatClient {
    async fn recent_messages(
        &self,
        channel_type: &str,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ServiceError> {
        let body = json!({
            "state": true,
            "watch": false,
            "presence": false,
            "messages": { "limit": limit },
        });
        let response = self
            .post(&Self::channel_path(channel_type, channel_id, "query"), body)
            .await?;
        let state: ChannelStateResponse = response.json().await?;
        debug!(
            channel_id,
            count = state.messages.len(),
            "Fetched channel messages."
        );

        // The platform returns oldest first; keep only the tail in case the
        // limit was not honoured.
        let skip = state.messages.len().saturating_sub(limit);
        Ok(state
            .messages
            .into_iter()
            .skip(skip)
            .map(ChatMessage::from)
            .collect())
    }

    async fn upsert_user(&self, user: &ChatUser) -> Result<(), ServiceError> {
        let mut users = HashMap::new();
        users.insert(user.id.as_str(), user);
        self.post("/users", json!({ "users": users })).await?;
        Ok(())
    }

    async fn send_message(
        &self,
        channel_type: &str,
        channel_id: &str,
        text: &str,
        author: &ChatUser,
    ) -> Result<(), ServiceError> {
        let body = json!({
            "message": {
                "text": text,
                "user": author,
            },
        });
        self.post(&Self::channel_path(channel_type, channel_id, "message"), body)
            .await?;
        Ok(())
    }
}
