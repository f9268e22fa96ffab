//! Job scraping strategies for scrapjobs.
//!
//! A site is scraped by one of three strategies chosen from its
//! [`ScrapingType`](scrapjobs_core::models::ScrapingType):
//!
//! - **Selector**: HTTP fetch plus CSS selectors ([`SelectorScraper`])
//! - **API**: a JSON endpoint with path mappings ([`ApiScraper`])
//! - **Headless**: Browserless-rendered pages, parsed like the selector
//!   strategy ([`HeadlessScraper`])
//!
//! [`ScraperFactory::for_config`] picks the strategy. A scrape stops fetching
//! at its deadline and returns what it collected; dropping the future cancels
//! it outright.

pub mod api;
pub mod browserless;
pub mod crawl;
pub mod error;
pub mod factory;
pub mod fetch;
pub mod headless;
pub mod parse;
pub mod selector;
pub mod throttle;

use async_trait::async_trait;
use scrapjobs_core::models::{JobCandidate, SiteScrapingConfig};
use tokio::time::Instant;

pub use api::ApiScraper;
pub use browserless::BrowserlessClient;
pub use crawl::CrawlOptions;
pub use error::{ScrapeError, ScrapeResult};
pub use factory::ScraperFactory;
pub use fetch::{HttpFetcher, PageFetcher};
pub use headless::HeadlessScraper;
pub use selector::SelectorScraper;
pub use throttle::{HostThrottle, ThrottleConfig};

/// Extracts job candidates from a site.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Scrape the site described by `config`, fetching nothing past `deadline`.
    async fn scrape(
        &self,
        config: &SiteScrapingConfig,
        deadline: Instant,
    ) -> ScrapeResult<Vec<JobCandidate>>;
}
