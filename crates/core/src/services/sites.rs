//! Site configuration lookup.

use async_trait::async_trait;
use scrapjobs_common::AppResult;
use scrapjobs_db::repositories::SiteConfigRepository;
use tracing::warn;

use crate::models::SiteScrapingConfig;

/// Read access to site scraping configurations.
#[async_trait]
pub trait SiteConfigStore: Send + Sync {
    /// All sites that should be crawled.
    ///
    /// Rows that cannot be turned into a valid configuration are logged and left out.
    async fn active_sites(&self) -> AppResult<Vec<SiteScrapingConfig>>;
}

#[async_trait]
impl SiteConfigStore for SiteConfigRepository {
    async fn active_sites(&self) -> AppResult<Vec<SiteScrapingConfig>> {
        let rows = self.find_active().await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let site_id = row.id;
                match SiteScrapingConfig::try_from(row) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        warn!(site_id, error = %e, "Ignoring invalid site configuration");
                        None
                    }
                }
            })
            .collect())
    }
}
