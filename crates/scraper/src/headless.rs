//! Headless strategy: pages rendered by a browser before parsing.

use std::sync::Arc;

use async_trait::async_trait;
use scrapjobs_core::models::{JobCandidate, SiteScrapingConfig};
use tokio::time::Instant;

use crate::Scraper;
use crate::crawl::{self, CrawlOptions};
use crate::error::ScrapeResult;
use crate::fetch::PageFetcher;

/// Scrapes career pages that build their job list with JavaScript.
///
/// Listing pages are rendered until the job list is visible; each detail page
/// is a separate navigation.
#[derive(Clone)]
pub struct HeadlessScraper {
    renderer: Arc<dyn PageFetcher>,
    options: CrawlOptions,
}

impl HeadlessScraper {
    /// Create a new headless scraper over a rendering fetcher.
    #[must_use]
    pub fn new(renderer: Arc<dyn PageFetcher>, options: CrawlOptions) -> Self {
        Self { renderer, options }
    }
}

#[async_trait]
impl Scraper for HeadlessScraper {
    async fn scrape(
        &self,
        config: &SiteScrapingConfig,
        deadline: Instant,
    ) -> ScrapeResult<Vec<JobCandidate>> {
        crawl::crawl(self.renderer.as_ref(), config, self.options, true, deadline).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::crawl::tests::{FakeFetcher, far_deadline, site};
    use scrapjobs_core::models::ScrapingType;

    #[tokio::test]
    async fn test_headless_waits_for_job_list() {
        let page = r#"<html><body><ul><li class="job"><a href="/jobs/9">Rendered</a></li></ul></body></html>"#;
        let fetcher = Arc::new(FakeFetcher::with_pages(&[("https://careers.example/jobs", page)]));
        let scraper = HeadlessScraper::new(fetcher.clone(), CrawlOptions::default());

        let candidates = scraper.scrape(&site(ScrapingType::Headless), far_deadline()).await.unwrap();

        assert_eq!(candidates[0].title, "Rendered");
        assert_eq!(
            fetcher.waits.lock().unwrap().first().cloned().flatten().as_deref(),
            Some("li.job")
        );
    }
}
