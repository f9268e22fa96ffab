//! Plan repository.

use std::sync::Arc;

use crate::entities::{Plan, User, plan, user};
use scrapjobs_common::{AppError, AppResult};
use sea_orm::{DatabaseConnection, EntityTrait};

/// Plan repository for database operations.
#[derive(Clone)]
pub struct PlanRepository {
    db: Arc<DatabaseConnection>,
}

impl PlanRepository {
    /// Create a new plan repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the plan the user is subscribed to.
    pub async fn find_by_user_id(&self, user_id: i32) -> AppResult<Option<plan::Model>> {
        let row: Option<(user::Model, Option<plan::Model>)> = User::find_by_id(user_id)
            .find_also_related(Plan)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.and_then(|(_, plan)| plan))
    }
}
