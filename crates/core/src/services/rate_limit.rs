//! Process-wide rate limiting of resume analyses.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use scrapjobs_common::config::AiSettings;
use scrapjobs_common::{AppError, AppResult};

use super::analysis::ResumeAnalyzer;
use crate::models::{Curriculum, Job, ResumeAnalysis};

/// Wraps a [`ResumeAnalyzer`] with a token bucket shared by all callers.
///
/// Callers wait for a token before the inner analyzer runs, so bounding the
/// caller with a timeout also bounds the wait.
pub struct RateLimitedAnalyzer {
    inner: Arc<dyn ResumeAnalyzer>,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl RateLimitedAnalyzer {
    /// Create a limiter allowing `requests_per_minute` with the given burst.
    pub fn new(
        inner: Arc<dyn ResumeAnalyzer>,
        requests_per_minute: u32,
        burst: u32,
    ) -> AppResult<Self> {
        let rate = NonZeroU32::new(requests_per_minute).ok_or_else(|| {
            AppError::Config("ai.requests_per_minute must be greater than zero".to_string())
        })?;
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(rate).allow_burst(burst);

        Ok(Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Create a limiter from AI settings.
    pub fn from_settings(inner: Arc<dyn ResumeAnalyzer>, settings: &AiSettings) -> AppResult<Self> {
        Self::new(inner, settings.requests_per_minute, settings.burst)
    }
}

#[async_trait]
impl ResumeAnalyzer for RateLimitedAnalyzer {
    async fn analyze(&self, curriculum: &Curriculum, job: &Job) -> AppResult<ResumeAnalysis> {
        self.limiter.until_ready().await;
        self.inner.analyze(curriculum, job).await
    }
}
