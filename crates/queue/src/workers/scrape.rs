//! Scrape stage.

use std::sync::Arc;
use std::time::Duration;

use apalis::prelude::*;
use scrapjobs_common::{AppError, AppResult, Metrics, Timer};
use scrapjobs_core::JobIngestService;
use scrapjobs_scraper::ScraperFactory;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::enqueuer::TaskQueue;
use crate::failures::FailureRecorder;
use crate::tasks::{ProcessResultsPayload, ScrapeSitePayload, TaskKind};

/// Scrapes one site and hands the stored jobs to the match stage.
#[derive(Clone)]
pub struct ScrapeHandler {
    scrapers: ScraperFactory,
    ingest: JobIngestService,
    queue: Arc<dyn TaskQueue>,
    metrics: Arc<Metrics>,
    timeout: Duration,
}

impl ScrapeHandler {
    /// Create a new scrape handler.
    #[must_use]
    pub fn new(
        scrapers: ScraperFactory,
        ingest: JobIngestService,
        queue: Arc<dyn TaskQueue>,
        metrics: Arc<Metrics>,
        timeout: Duration,
    ) -> Self {
        Self {
            scrapers,
            ingest,
            queue,
            metrics,
            timeout,
        }
    }

    /// Run the stage.
    ///
    /// The scraper gets the stage timeout as its deadline and returns what it
    /// collected by then. Scrape failures end the task successfully with
    /// nothing stored; the next crawl cycle tries the site again. Storage and
    /// enqueue failures fail the task.
    pub async fn handle(&self, payload: ScrapeSitePayload) -> AppResult<()> {
        let ScrapeSitePayload { site_id, config } = payload;
        if site_id != config.id {
            return Err(AppError::Config(format!(
                "scrape payload for site {site_id} carries the configuration of site {}",
                config.id
            )));
        }

        let scraper = match self.scrapers.for_config(&config) {
            Ok(scraper) => scraper,
            Err(e) => {
                warn!(site_id, site = %config.site_name, error = %e, "Cannot scrape site");
                Metrics::add(&self.metrics.scrape_failures, 1);
                return Ok(());
            }
        };

        let timer = Timer::start();
        let deadline = Instant::now() + self.timeout;
        let hard_limit = self.timeout + self.timeout / 10;
        let candidates = match tokio::time::timeout(hard_limit, scraper.scrape(&config, deadline)).await {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(e)) => {
                warn!(
                    site_id,
                    site = %config.site_name,
                    config_error = e.is_config_error(),
                    error = %e,
                    "Scrape failed"
                );
                Metrics::add(&self.metrics.scrape_failures, 1);
                return Ok(());
            }
            Err(_) => {
                warn!(site_id, site = %config.site_name, timeout = ?hard_limit, "Scrape ignored its deadline");
                Metrics::add(&self.metrics.scrape_failures, 1);
                return Ok(());
            }
        };

        let found = candidates.len();
        if found == 0 {
            info!(site_id, site = %config.site_name, "Scrape found no jobs");
            return Ok(());
        }

        let outcome = self.ingest.ingest(site_id, candidates).await?;
        self.metrics.record_scrape(found, outcome.inserted);
        info!(
            site_id,
            site = %config.site_name,
            found,
            inserted = outcome.inserted,
            refreshed = outcome.refreshed,
            skipped = outcome.skipped,
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "Scrape stored"
        );

        if outcome.jobs.is_empty() {
            return Ok(());
        }

        self.queue
            .enqueue_process_results(ProcessResultsPayload {
                site_id,
                jobs: outcome.jobs,
            })
            .await
    }
}

/// Worker function for `scrape:site` tasks.
///
/// # Errors
/// Returns an error when the jobs could not be stored or handed on.
pub async fn scrape_worker(
    payload: ScrapeSitePayload,
    handler: Data<ScrapeHandler>,
    failures: Data<FailureRecorder>,
    task_id: TaskId,
) -> Result<(), Error> {
    let site_id = payload.site_id;
    match handler.handle(payload).await {
        Ok(()) => Ok(()),
        Err(e) => Err(failures.fail(TaskKind::ScrapeSite, &task_id, site_id, e).await),
    }
}
