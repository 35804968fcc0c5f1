//! Data access for meetings and agents.
//!
//! Webhook handlers never issue queries directly; they go through the
//! [`MeetingStore`] trait so every status change is expressed as one
//! conditional update and so tests can swap in an in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;

use crate::db::entities::{agent, meeting};
use crate::db::enums::MeetingStatus;

pub mod meeting_service;

pub use meeting_service::SeaOrmMeetingStore;

/// Row predicate applied on top of the meeting id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingGuard {
    pub status: Option<MeetingStatus>,
    pub user_id: Option<String>,
}

impl MeetingGuard {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_status(status: MeetingStatus) -> Self {
        Self {
            status: Some(status),
            user_id: None,
        }
    }

    pub fn owned_by(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Columns to overwrite. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingUpdate {
    pub status: Option<MeetingStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub transcript_url: Option<String>,
    pub recording_url: Option<String>,
    pub summary: Option<String>,
}

#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn find_meeting(
        &self,
        meeting_id: &str,
        guard: MeetingGuard,
    ) -> Result<Option<meeting::Model>, DbErr>;

    /// Applies `update` in a single statement conditioned on `guard` and
    /// returns the updated row, or `None` when no row matched.
    async fn update_meeting(
        &self,
        meeting_id: &str,
        guard: MeetingGuard,
        update: MeetingUpdate,
    ) -> Result<Option<meeting::Model>, DbErr>;

    async fn find_agent(&self, agent_id: &str) -> Result<Option<agent::Model>, DbErr>;
}
