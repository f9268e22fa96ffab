//! Job repository.

use std::sync::Arc;

use crate::entities::{Job, job};
use chrono::{DateTime, Utc};
use scrapjobs_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::Expr,
};

/// Fields of a job that is about to be stored for the first time.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub site_id: i32,
    pub title: String,
    pub location: String,
    pub company: String,
    pub job_link: String,
    pub requisition_id: i64,
    pub description: Option<String>,
}

/// Job repository for database operations.
#[derive(Clone)]
pub struct JobRepository {
    db: Arc<DatabaseConnection>,
}

impl JobRepository {
    /// Create a new job repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a job and return the stored row.
    pub async fn create(&self, new_job: NewJob) -> AppResult<job::Model> {
        let now = Utc::now();
        let model = job::ActiveModel {
            site_id: Set(new_job.site_id),
            title: Set(new_job.title),
            location: Set(new_job.location),
            company: Set(new_job.company),
            job_link: Set(new_job.job_link),
            requisition_id: Set(new_job.requisition_id),
            description: Set(new_job.description),
            created_at: Set(now.into()),
            last_seen_at: Set(now.into()),
            ..Default::default()
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the jobs of a site whose requisition id is in `requisition_ids`.
    pub async fn find_by_requisition_ids(
        &self,
        site_id: i32,
        requisition_ids: &[i64],
    ) -> AppResult<Vec<job::Model>> {
        if requisition_ids.is_empty() {
            return Ok(vec![]);
        }

        Job::find()
            .filter(job::Column::SiteId.eq(site_id))
            .filter(job::Column::RequisitionId.is_in(requisition_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a job as seen now.
    pub async fn touch_last_seen(&self, id: i32) -> AppResult<()> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        Job::update_many()
            .col_expr(job::Column::LastSeenAt, Expr::value(now))
            .filter(job::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Delete every job last seen before `cutoff`.
    pub async fn delete_seen_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = Job::delete_many()
            .filter(job::Column::LastSeenAt.lt(cutoff))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
