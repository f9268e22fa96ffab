//! Site scraping configuration repository.

use std::sync::Arc;

use crate::entities::{SiteScrapingConfig, site_scraping_config};
use scrapjobs_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Site configuration repository for database operations.
#[derive(Clone)]
pub struct SiteConfigRepository {
    db: Arc<DatabaseConnection>,
}

impl SiteConfigRepository {
    /// Create a new site configuration repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a site configuration by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<site_scraping_config::Model>> {
        SiteScrapingConfig::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All sites that should be crawled.
    pub async fn find_active(&self) -> AppResult<Vec<site_scraping_config::Model>> {
        SiteScrapingConfig::find()
            .filter(site_scraping_config::Column::IsActive.eq(true))
            .order_by_asc(site_scraping_config::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
