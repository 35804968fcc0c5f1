use tracing::{error, info};

use super::error::WebhookError;
use crate::db::entities::meeting;
use crate::db::services::MeetingStore;
use crate::services::VideoPlatform;

/// Puts the meeting's agent into the live call.
///
/// Runs only after the meeting was flipped to `active`, so it executes at
/// most once per meeting. A failure here leaves the meeting `active` without
/// an agent; the error is returned to the sender and nothing is rolled back.
pub async fn connect_agent(
    store: &dyn MeetingStore,
    video: &dyn VideoPlatform,
    call_type: &str,
    llm_api_key: &str,
    meeting: &meeting::Model,
) -> Result<(), WebhookError> {
    let Some(agent) = store.find_agent(&meeting.agent_id).await? else {
        error!(
            meeting_id = %meeting.id,
            agent_id = %meeting.agent_id,
            "Meeting is active but its agent does not exist."
        );
        return Err(WebhookError::AgentNotFound);
    };

    let session = video
        .connect_agent(call_type, &meeting.id, llm_api_key, &agent.id)
        .await
        .inspect_err(|e| {
            error!(meeting_id = %meeting.id, error = %e, "Failed to connect agent to call.");
        })?;
    session.update_instructions(&agent.instructions).await?;

    info!(meeting_id = %meeting.id, agent_id = %agent.id, "Agent joined the call.");
    Ok(())
}
