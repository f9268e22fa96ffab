//! Selector-based strategy: plain HTTP fetches parsed with CSS selectors.

use std::sync::Arc;

use async_trait::async_trait;
use scrapjobs_core::models::{JobCandidate, SiteScrapingConfig};
use tokio::time::Instant;

use crate::Scraper;
use crate::crawl::{self, CrawlOptions};
use crate::error::ScrapeResult;
use crate::fetch::PageFetcher;

/// Scrapes static career pages.
#[derive(Clone)]
pub struct SelectorScraper {
    fetcher: Arc<dyn PageFetcher>,
    options: CrawlOptions,
}

impl SelectorScraper {
    /// Create a new selector scraper.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, options: CrawlOptions) -> Self {
        Self { fetcher, options }
    }
}

#[async_trait]
impl Scraper for SelectorScraper {
    async fn scrape(
        &self,
        config: &SiteScrapingConfig,
        deadline: Instant,
    ) -> ScrapeResult<Vec<JobCandidate>> {
        crawl::crawl(self.fetcher.as_ref(), config, self.options, false, deadline).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::crawl::tests::{FakeFetcher, far_deadline, site};
    use scrapjobs_core::models::ScrapingType;

    #[tokio::test]
    async fn test_selector_scraper_does_not_wait_for_rendering() {
        let page = r#"<html><body><ul><li class="job"><a href="/jobs/5">QA</a></li></ul></body></html>"#;
        let fetcher = Arc::new(FakeFetcher::with_pages(&[("https://careers.example/jobs", page)]));
        let scraper = SelectorScraper::new(fetcher.clone(), CrawlOptions::default());

        let mut config = site(ScrapingType::Selector);
        config.selectors.job_description = None;
        config.selectors.job_requisition_id = None;

        let candidates = scraper.scrape(&config, far_deadline()).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "QA");
        assert!(fetcher.waits.lock().unwrap().iter().all(Option::is_none));
        assert_eq!(fetcher.visits("https://careers.example/jobs/5"), 0);
    }
}
