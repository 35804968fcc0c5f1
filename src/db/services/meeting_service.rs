use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use tracing::debug;

use super::{MeetingGuard, MeetingStore, MeetingUpdate};
use crate::db::entities::{agent, meeting};

pub struct SeaOrmMeetingStore {
    db: DatabaseConnection,
}

impl SeaOrmMeetingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_active_model(update: MeetingUpdate) -> meeting::ActiveModel {
    let mut active = meeting::ActiveModel {
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Some(status) = update.status {
        active.status = Set(status);
    }
    if let Some(started_at) = update.started_at {
        active.started_at = Set(Some(started_at));
    }
    if let Some(ended_at) = update.ended_at {
        active.ended_at = Set(Some(ended_at));
    }
    if let Some(url) = update.transcript_url {
        active.transcript_url = Set(Some(url));
    }
    if let Some(url) = update.recording_url {
        active.recording_url = Set(Some(url));
    }
    if let Some(summary) = update.summary {
        active.summary = Set(Some(summary));
    }
    active
}

#[async_trait]
impl MeetingStore for SeaOrmMeetingStore {
    async fn find_meeting(
        &self,
        meeting_id: &str,
        guard: MeetingGuard,
    ) -> Result<Option<meeting::Model>, DbErr> {
        let mut query = meeting::Entity::find_by_id(meeting_id.to_string());
        if let Some(status) = guard.status {
            query = query.filter(meeting::Column::Status.eq(status));
        }
        if let Some(user_id) = guard.user_id {
            query = query.filter(meeting::Column::UserId.eq(user_id));
        }
        query.one(&self.db).await
    }

    async fn update_meeting(
        &self,
        meeting_id: &str,
        guard: MeetingGuard,
        update: MeetingUpdate,
    ) -> Result<Option<meeting::Model>, DbErr> {
        // The guard lives in the WHERE clause of the same statement, so two
        // concurrent callers cannot both match the same expected status.
        let mut query = meeting::Entity::update_many()
            .set(to_active_model(update))
            .filter(meeting::Column::Id.eq(meeting_id));
        if let Some(status) = guard.status {
            query = query.filter(meeting::Column::Status.eq(status));
        }
        if let Some(user_id) = guard.user_id {
            query = query.filter(meeting::Column::UserId.eq(user_id));
        }

        let mut rows = query.exec_with_returning(&self.db).await?;
        debug!(meeting_id, rows = rows.len(), "Conditional meeting update executed.");
        Ok(rows.pop())
    }

    async fn find_agent(&self, agent_id: &str) -> Result<Option<agent::Model>, DbErr> {
        agent::Entity::find_by_id(agent_id.to_string())
            .one(&self.db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::MeetingStatus;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, Statement, Value};

    fn sample_meeting(status: MeetingStatus) -> meeting::Model {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        meeting::Model {
            id: "m1".to_string(),
            name: "Weekly sync".to_string(),
            user_id: "u1".to_string(),
            agent_id: "a1".to_string(),
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

    /// The only statement the store sent, with its SQL cut before `RETURNING`.
    fn single_statement(store: SeaOrmMeetingStore) -> (String, Vec<Value>) {
        let log = store.db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let statements: Vec<Statement> = log[0].statements().to_vec();
        assert_eq!(statements.len(), 1);
        let Statement { sql, values, .. } = statements.into_iter().next().unwrap();
        let head = sql.split(" RETURNING ").next().unwrap().to_string();
        (head, values.map(|v| v.0).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_status_guard_is_part_of_the_update() {
        let mut returned = sample_meeting(MeetingStatus::Active);
        returned.started_at = Some(Utc::now());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![returned.clone()]])
            .into_connection();
        let store = SeaOrmMeetingStore::new(db);

        store
            .update_meeting(
                "m1",
                MeetingGuard::with_status(MeetingStatus::Upcoming),
                MeetingUpdate {
                    status: Some(MeetingStatus::Active),
                    started_at: returned.started_at,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let (sql, values) = single_statement(store);
        assert_eq!(
            sql,
            r#"UPDATE "meetings" SET "status" = $1, "started_at" = $2, "updated_at" = $3 WHERE "meetings"."id" = $4 AND "meetings"."status" = $5"#
        );
        assert_eq!(values[0], Value::from("active"));
        assert_eq!(values[3], Value::from("m1"));
        assert_eq!(values[4], Value::from("upcoming"));
    }

    #[tokio::test]
    async fn test_owner_guard_is_part_of_the_update() {
        let mut returned = sample_meeting(MeetingStatus::Cancelled);
        returned.user_id = "u1".to_string();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![returned]])
            .into_connection();
        let store = SeaOrmMeetingStore::new(db);

        store
            .update_meeting(
                "m1",
                MeetingGuard::with_status(MeetingStatus::Upcoming).owned_by("u1"),
                MeetingUpdate {
                    status: Some(MeetingStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let (sql, values) = single_statement(store);
        assert_eq!(
            sql,
            r#"UPDATE "meetings" SET "status" = $1, "updated_at" = $2 WHERE "meetings"."id" = $3 AND "meetings"."status" = $4 AND "meetings"."user_id" = $5"#
        );
        assert_eq!(values[0], Value::from("cancelled"));
        assert_eq!(values[2], Value::from("m1"));
        assert_eq!(values[3], Value::from("upcoming"));
        assert_eq!(values[4], Value::from("u1"));
    }

    #[tokio::test]
    async fn test_unguarded_update_only_matches_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_meeting(MeetingStatus::Completed)]])
            .into_connection();
        let store = SeaOrmMeetingStore::new(db);

        store
            .update_meeting(
                "m1",
                MeetingGuard::any(),
                MeetingUpdate {
                    recording_url: Some("https://cdn/rec.mp4".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let (sql, values) = single_statement(store);
        assert_eq!(
            sql,
            r#"UPDATE "meetings" SET "recording_url" = $1, "updated_at" = $2 WHERE "meetings"."id" = $3"#
        );
        assert_eq!(values[2], Value::from("m1"));
    }

    #[tokio::test]
    async fn test_find_meeting_filters_on_status() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<meeting::Model>::new()])
            .into_connection();
        let store = SeaOrmMeetingStore::new(db);

        let found = store
            .find_meeting("m1", MeetingGuard::with_status(MeetingStatus::Completed))
            .await
            .unwrap();
        assert!(found.is_none());

        let (sql, values) = single_statement(store);
        assert!(
            sql.contains(r#"WHERE "meetings"."id" = $1 AND "meetings"."status" = $2"#),
            "{sql}"
        );
        assert_eq!(values[1], Value::from("completed"));
    }

    #[tokio::test]
    async fn test_update_returns_matched_row() {
        let mut returned = sample_meeting(MeetingStatus::Active);
        returned.started_at = Some(Utc::now());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![returned.clone()]])
            .into_connection();
        let store = SeaOrmMeetingStore::new(db);

        let update = MeetingUpdate {
            status: Some(MeetingStatus::Active),
            started_at: returned.started_at,
            ..Default::default()
        };
        let row = store
            .update_meeting("m1", MeetingGuard::with_status(MeetingStatus::Upcoming), update)
            .await
            .unwrap();

        assert_eq!(row, Some(returned));
    }

    #[tokio::test]
    async fn test_update_with_no_matching_row_is_none() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<meeting::Model>::new()])
            .into_connection();
        let store = SeaOrmMeetingStore::new(db);

        let row = store
            .update_meeting(
                "m1",
                MeetingGuard::with_status(MeetingStatus::Active),
                MeetingUpdate {
                    status: Some(MeetingStatus::Processing),
                    ended_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_find_agent() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let agent = agent::Model {
            id: "a1".to_string(),
            name: "Tutor".to_string(),
            user_id: "u1".to_string(),
            instructions: "Be concise.".to_string(),
            created_at: created,
            updated_at: created,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![agent.clone()]])
            .into_connection();
        let store = SeaOrmMeetingStore::new(db);

        assert_eq!(store.find_agent("a1").await.unwrap(), Some(agent));
    }

    #[test]
    fn test_update_only_sets_requested_columns() {
        let active = to_active_model(MeetingUpdate {
            recording_url: Some("https://cdn/rec.mp4".to_string()),
            ..Default::default()
        });

        assert!(active.status.is_not_set());
        assert!(active.transcript_url.is_not_set());
        assert_eq!(
            active.recording_url,
            Set(Some("https://cdn/rec.mp4".to_string()))
        );
        assert!(active.updated_at.is_set());
    }
}
