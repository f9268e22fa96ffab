//! Scraper error types.

use std::time::Duration;

use scrapjobs_common::AppError;
use thiserror::Error;

/// Errors raised while scraping a site.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The site configuration cannot be used by the selected strategy.
    #[error("invalid scraping configuration: {0}")]
    Config(String),

    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body is not the expected JSON.
    #[error("invalid JSON response: {0}")]
    Json(String),

    /// A CSS selector does not parse.
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },

    /// The headless rendering service failed.
    #[error("browserless error (status {status}): {message}")]
    Browserless { status: u16, message: String },

    /// The scrape did not finish in time.
    #[error("scrape timed out after {0:?}")]
    Timeout(Duration),
}

impl ScrapeError {
    /// Whether the error comes from the site configuration rather than the
    /// network or the remote site.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Selector { .. })
    }
}

impl From<serde_json::Error> for ScrapeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<ScrapeError> for AppError {
    fn from(err: ScrapeError) -> Self {
        if err.is_config_error() {
            Self::Config(err.to_string())
        } else {
            Self::Scrape(err.to_string())
        }
    }
}

/// Result type for scraping.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
