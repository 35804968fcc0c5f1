use sea_orm::DbErr;
use thiserror::Error;

use crate::services::ServiceError;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Missing signature or API Key")]
    MissingCredentials,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid API Key")]
    InvalidApiKey,
    #[error("Invalid JSON payload: {0}")]
    MalformedPayload(String),
    #[error("Meeting ID is missing in the event")]
    MissingMeetingId,
    #[error("Meeting ID, User ID, Text or Channel ID is missing in the event")]
    MissingFields,
    /// No meeting matched the id together with the status the handler
    /// required; duplicate deliveries land here too.
    #[error("{0}")]
    MeetingNotFound(&'static str),
    #[error("Agent not found for the meeting")]
    AgentNotFound,
    #[error("No response from the completion service")]
    NoCompletion,
    #[error("Failed to enqueue job {job}: {source}")]
    EnqueueFailed {
        job: &'static str,
        #[source]
        source: ServiceError,
    },
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),
    #[error("Upstream service error: {0}")]
    UpstreamError(#[from] ServiceError),
}
