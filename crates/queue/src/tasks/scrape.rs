//! Scrape-site task.

use scrapjobs_core::models::SiteScrapingConfig;
use serde::{Deserialize, Serialize};

/// Scrape one site with the configuration captured at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeSitePayload {
    pub site_id: i32,
    pub config: SiteScrapingConfig,
}

impl ScrapeSitePayload {
    /// Create a payload for a site.
    #[must_use]
    pub fn new(config: SiteScrapingConfig) -> Self {
        Self {
            site_id: config.id,
            config,
        }
    }
}
