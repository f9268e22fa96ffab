//! Strategy selection.

use std::sync::Arc;
use std::time::Duration;

use scrapjobs_common::config::ScraperSettings;
use scrapjobs_core::models::{ScrapingType, SiteScrapingConfig};

use crate::Scraper;
use crate::api::ApiScraper;
use crate::browserless::BrowserlessClient;
use crate::crawl::CrawlOptions;
use crate::error::{ScrapeError, ScrapeResult};
use crate::fetch::HttpFetcher;
use crate::headless::HeadlessScraper;
use crate::selector::SelectorScraper;
use crate::throttle::{HostThrottle, ThrottleConfig};

/// Hands out the scraper matching a site's scraping type.
#[derive(Clone)]
pub struct ScraperFactory {
    selector: Arc<dyn Scraper>,
    api: Arc<dyn Scraper>,
    headless: Option<Arc<dyn Scraper>>,
}

impl ScraperFactory {
    /// Create a factory from explicit strategies.
    #[must_use]
    pub fn new(
        selector: Arc<dyn Scraper>,
        api: Arc<dyn Scraper>,
        headless: Option<Arc<dyn Scraper>>,
    ) -> Self {
        Self {
            selector,
            api,
            headless,
        }
    }

    /// Build every strategy from settings.
    ///
    /// All strategies of the process share one per-host throttle. The
    /// headless strategy is only available when a Browserless endpoint is
    /// configured.
    pub fn from_settings(settings: &ScraperSettings) -> ScrapeResult<Self> {
        let throttle = HostThrottle::new(ThrottleConfig::from(settings));
        let options = CrawlOptions::from(settings);

        let http = HttpFetcher::new(settings, throttle.clone())?;
        let api_client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        let headless = BrowserlessClient::from_settings(settings, throttle)?.map(|client| {
            Arc::new(HeadlessScraper::new(Arc::new(client), options)) as Arc<dyn Scraper>
        });

        Ok(Self::new(
            Arc::new(SelectorScraper::new(Arc::new(http), options)),
            Arc::new(ApiScraper::new(api_client)),
            headless,
        ))
    }

    /// The scraper for a site.
    pub fn for_config(&self, config: &SiteScrapingConfig) -> ScrapeResult<Arc<dyn Scraper>> {
        match config.scraping_type {
            ScrapingType::Selector => Ok(self.selector.clone()),
            ScrapingType::Api => Ok(self.api.clone()),
            ScrapingType::Headless => self.headless.clone().ok_or_else(|| {
                ScrapeError::Config(format!(
                    "site {}: headless scraping requires scraper.browserless_url",
                    config.id
                ))
            }),
        }
    }
}
