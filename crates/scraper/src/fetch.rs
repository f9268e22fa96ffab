//! Page acquisition.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scrapjobs_common::config::ScraperSettings;
use url::Url;

use crate::error::{ScrapeError, ScrapeResult};
use crate::throttle::HostThrottle;

/// Fetches the HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, optionally waiting until `wait_for` matches an element
    /// when the fetcher renders pages.
    async fn fetch_page(&self, url: &Url, wait_for: Option<&str>) -> ScrapeResult<String>;
}

/// Plain HTTP fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    throttle: HostThrottle,
}

impl HttpFetcher {
    /// Create a fetcher from scraper settings.
    pub fn new(settings: &ScraperSettings, throttle: HostThrottle) -> ScrapeResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self { client, throttle })
    }

    /// The underlying HTTP client.
    #[must_use]
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &Url, _wait_for: Option<&str>) -> ScrapeResult<String> {
        if let Some(host) = url.host_str() {
            self.throttle.acquire(host).await;
        }

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch_page(&self, url: &Url, wait_for: Option<&str>) -> ScrapeResult<String> {
        (**self).fetch_page(url, wait_for).await
    }
}
