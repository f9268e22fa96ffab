//! Job notification repository.

use std::sync::Arc;

use crate::entities::{JobNotification, job_notification};
use chrono::{DateTime, Utc};
use scrapjobs_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
    sea_query::OnConflict,
};

/// Job notification repository for database operations.
#[derive(Clone)]
pub struct JobNotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl JobNotificationRepository {
    /// Create a new job notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record that `user_id` was notified about `job_id`.
    ///
    /// Returns `false` when the pair was already recorded.
    pub async fn insert_if_absent(&self, user_id: i32, job_id: i32) -> AppResult<bool> {
        let model = job_notification::ActiveModel {
            user_id: Set(user_id),
            job_id: Set(job_id),
            notified_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let rows = JobNotification::insert(model)
            .on_conflict(
                OnConflict::columns([
                    job_notification::Column::UserId,
                    job_notification::Column::JobId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows > 0)
    }

    /// Return the subset of `job_ids` the user was already notified about.
    pub async fn find_notified_job_ids(
        &self,
        user_id: i32,
        job_ids: &[i32],
    ) -> AppResult<Vec<i32>> {
        if job_ids.is_empty() {
            return Ok(vec![]);
        }

        JobNotification::find()
            .select_only()
            .column(job_notification::Column::JobId)
            .filter(job_notification::Column::UserId.eq(user_id))
            .filter(job_notification::Column::JobId.is_in(job_ids.to_vec()))
            .into_tuple::<i32>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count notifications recorded for the user since `since`.
    pub async fn count_since(&self, user_id: i32, since: DateTime<Utc>) -> AppResult<u64> {
        JobNotification::find()
            .filter(job_notification::Column::UserId.eq(user_id))
            .filter(job_notification::Column::NotifiedAt.gte(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_insert_if_absent_new_pair() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 1,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = JobNotificationRepository::new(db);
        assert!(repo.insert_if_absent(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_if_absent_existing_pair() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = JobNotificationRepository::new(db);
        assert!(!repo.insert_if_absent(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_notified_job_ids_empty_input() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = JobNotificationRepository::new(db);
        assert!(repo.find_notified_job_ids(1, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_count_since() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(4))
                }]])
                .into_connection(),
        );

        let repo = JobNotificationRepository::new(db);
        let count = repo.count_since(1, Utc::now()).await.unwrap();

        assert_eq!(count, 4);
    }
}
