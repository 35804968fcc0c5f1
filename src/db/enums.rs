use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a meeting.
///
/// `upcoming -> active -> processing -> completed`, with `cancelled` reachable
/// from `upcoming` only. Webhooks drive every edge except cancellation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "meeting_status")]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    #[sea_orm(string_value = "upcoming")]
    Upcoming,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl MeetingStatus {
    pub fn can_transition_to(self, next: MeetingStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (MeetingStatus::Upcoming, MeetingStatus::Active)
                | (MeetingStatus::Upcoming, MeetingStatus::Cancelled)
                | (MeetingStatus::Active, MeetingStatus::Processing)
                | (MeetingStatus::Processing, MeetingStatus::Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MeetingStatus::Completed | MeetingStatus::Cancelled)
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeetingStatus::Upcoming => "upcoming",
            MeetingStatus::Active => "active",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Processing => "processing",
            MeetingStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
