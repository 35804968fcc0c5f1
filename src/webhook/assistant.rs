//! Answers chat messages about a finished meeting, speaking as its agent.

use tracing::{debug, info};

use super::error::WebhookError;
use super::events::NewMessage;
use super::WebhookOutcome;
use crate::db::enums::MeetingStatus;
use crate::db::services::{MeetingGuard, MeetingStore};
use crate::services::avatar::bot_avatar_url;
use crate::services::{
    ChatMessage, ChatPlatform, ChatUser, CompletionMessage, CompletionRole, CompletionService,
};

const MISSING_SUMMARY: &str = "(No summary is available for this meeting.)";

pub fn build_system_prompt(summary: Option<&str>, instructions: &str) -> String {
    let summary = summary.filter(|s| !s.trim().is_empty()).unwrap_or(MISSING_SUMMARY);
    format!(
        "You are an AI assistant helping the user revisit a recently completed meeting.
Below is a summary of the meeting, generated from the transcript:

{summary}

The following are your original instructions from the live meeting assistant. Please continue to follow these behavioral guidelines as you assist the user:

{instructions}

The user may ask questions about the meeting, request clarifications, or ask for follow-up actions.
Always base your responses on the meeting summary above.

You also have access to the recent conversation history between you and the user. Use the context of previous messages to provide relevant, coherent, and helpful responses. If the user's question refers to something discussed earlier, make sure to take that into account and maintain continuity in the conversation.

If the summary does not contain enough information to answer a question, politely let the user know.

Be concise, helpful, and focus on providing accurate information from the meeting and the ongoing conversation."
    )
}

/// Maps the newest `limit` channel messages to completion turns. Blank
/// messages inside that window are dropped, not replaced.
pub fn history_messages(
    messages: &[ChatMessage],
    agent_id: &str,
    limit: usize,
) -> Vec<CompletionMessage> {
    let start = messages.len().saturating_sub(limit);
    messages[start..]
        .iter()
        .filter_map(|message| {
            let text = message.text.as_deref().filter(|t| !t.trim().is_empty())?;
            let role = if message.user_id.as_deref() == Some(agent_id) {
                CompletionRole::Assistant
            } else {
                CompletionRole::User
            };
            Some(CompletionMessage::new(role, text))
        })
        .collect()
}

pub struct AssistantBridge<'a> {
    pub store: &'a dyn MeetingStore,
    pub chat: &'a dyn ChatPlatform,
    pub completions: &'a dyn CompletionService,
    pub channel_type: &'a str,
    pub history_limit: usize,
}

impl AssistantBridge<'_> {
    pub async fn answer(&self, message: &NewMessage) -> Result<WebhookOutcome, WebhookError> {
        // The chat channel is created with the meeting's id.
        let meeting = self
            .store
            .find_meeting(
                &message.channel_id,
                MeetingGuard::with_status(MeetingStatus::Completed),
            )
            .await?
            .ok_or(WebhookError::MeetingNotFound(
                "Meeting not found or not completed",
            ))?;

        let agent = self
            .store
            .find_agent(&meeting.agent_id)
            .await?
            .ok_or(WebhookError::AgentNotFound)?;

        if message.user_id == agent.id {
            debug!(meeting_id = %meeting.id, "Ignoring message authored by the agent.");
            return Ok(WebhookOutcome::Unchanged);
        }

        let history = self
            .chat
            .recent_messages(self.channel_type, &message.channel_id, self.history_limit)
            .await?;

        let mut prompt = Vec::with_capacity(history.len() + 2);
        prompt.push(CompletionMessage::new(
            CompletionRole::System,
            build_system_prompt(meeting.summary.as_deref(), &agent.instructions),
        ));
        prompt.extend(history_messages(&history, &agent.id, self.history_limit));
        prompt.push(CompletionMessage::new(CompletionRole::User, message.text.as_str()));

        let reply = self
            .completions
            .complete(&prompt)
            .await?
            .filter(|text| !text.is_empty())
            .ok_or(WebhookError::NoCompletion)?;

        let author = ChatUser {
            id: agent.id.clone(),
            name: agent.name.clone(),
            image: Some(bot_avatar_url(&agent.name)),
        };
        self.chat.upsert_user(&author).await?;
        self.chat
            .send_message(self.channel_type, &message.channel_id, &reply, &author)
            .await?;

        info!(
            meeting_id = %meeting.id,
            agent_id = %agent.id,
            history = prompt.len() - 2,
            "Agent replied in meeting chat."
        );
        Ok(WebhookOutcome::Applied)
    }
}
