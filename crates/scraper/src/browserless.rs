//! Browserless rendering client.

use std::time::Duration;

use async_trait::async_trait;
use scrapjobs_common::config::ScraperSettings;
use url::Url;

use crate::error::{ScrapeError, ScrapeResult};
use crate::fetch::PageFetcher;
use crate::throttle::HostThrottle;

/// Client for the Browserless `/content` endpoint.
#[derive(Clone)]
pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    throttle: HostThrottle,
}

impl BrowserlessClient {
    /// Create a client for the given endpoint.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        timeout: Duration,
        throttle: HostThrottle,
    ) -> ScrapeResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            throttle,
        })
    }

    /// Create a client from settings, if a Browserless endpoint is configured.
    pub fn from_settings(
        settings: &ScraperSettings,
        throttle: HostThrottle,
    ) -> ScrapeResult<Option<Self>> {
        settings
            .browserless_url
            .as_deref()
            .map(|url| {
                Self::new(
                    url,
                    settings.browserless_token.as_deref(),
                    Duration::from_secs(settings.request_timeout_secs),
                    throttle,
                )
            })
            .transpose()
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str("?token=");
            endpoint.push_str(token);
        }
        endpoint
    }

    /// Fetch fully rendered HTML for a URL.
    pub async fn content(&self, url: &str, wait_for: Option<&str>) -> ScrapeResult<String> {
        let mut body = serde_json::json!({ "url": url });
        if let Some(selector) = wait_for {
            body["waitForSelector"] = serde_json::json!({ "selector": selector, "visible": true });
        }

        let resp = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ScrapeError::Browserless {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

#[async_trait]
impl PageFetcher for BrowserlessClient {
    async fn fetch_page(&self, url: &Url, wait_for: Option<&str>) -> ScrapeResult<String> {
        if let Some(host) = url.host_str() {
            self.throttle.acquire(host).await;
        }
        self.content(url.as_str(), wait_for).await
    }
}
