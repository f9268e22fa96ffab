//! User site subscription repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Curriculum, User, UserSite, curriculum, user, user_site};
use scrapjobs_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// A subscriber of a site with everything needed for matching.
#[derive(Debug, Clone)]
pub struct SubscriberRow {
    pub user: user::Model,
    pub filters: Vec<String>,
    pub curriculum: Option<curriculum::Model>,
}

/// Subscription repository for database operations.
#[derive(Clone)]
pub struct SubscriptionRepository {
    db: Arc<DatabaseConnection>,
}

impl SubscriptionRepository {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Users subscribed to a site, with their keyword filters and active curriculum.
    pub async fn find_subscribers(&self, site_id: i32) -> AppResult<Vec<SubscriberRow>> {
        let subscriptions: Vec<(user_site::Model, Option<user::Model>)> = UserSite::find()
            .filter(user_site::Column::SiteId.eq(site_id))
            .find_also_related(User)
            .order_by_asc(user_site::Column::UserId)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if subscriptions.is_empty() {
            return Ok(vec![]);
        }

        let user_ids: Vec<i32> = subscriptions.iter().map(|(s, _)| s.user_id).collect();
        let mut curricula: HashMap<i32, curriculum::Model> = Curriculum::find()
            .filter(curriculum::Column::UserId.is_in(user_ids))
            .filter(curriculum::Column::IsActive.eq(true))
            .order_by_desc(curriculum::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .into_iter()
            .fold(HashMap::new(), |mut acc, c| {
                acc.entry(c.user_id).or_insert(c);
                acc
            });

        Ok(subscriptions
            .into_iter()
            .filter_map(|(subscription, user)| {
                let user = user?;
                Some(SubscriberRow {
                    filters: parse_filters(&subscription.filters),
                    curriculum: curricula.remove(&user.id),
                    user,
                })
            })
            .collect())
    }
}

/// Keyword filters are stored as a JSON array; anything else counts as no filter.
fn parse_filters(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    #[test]
    fn test_parse_filters() {
        assert_eq!(
            parse_filters(&json!(["rust", " go ", "", 3])),
            vec!["rust".to_string(), "go".to_string()]
        );
        assert!(parse_filters(&json!(null)).is_empty());
        assert!(parse_filters(&json!({"k": "v"})).is_empty());
    }

    #[tokio::test]
    async fn test_find_subscribers_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user_site::Model>::new()])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        assert!(repo.find_subscribers(1).await.unwrap().is_empty());
    }
}
