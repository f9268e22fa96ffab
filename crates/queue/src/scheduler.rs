//! Periodic crawl and purge.

use std::sync::Arc;
use std::time::Duration;

use scrapjobs_common::config::SchedulerSettings;
use scrapjobs_common::{AppResult, Metrics};
use scrapjobs_core::{JobIngestService, SiteConfigStore};
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::enqueuer::TaskQueue;
use crate::tasks::ScrapeSitePayload;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between crawls (default: 1 hour).
    pub crawl_interval: Duration,
    /// Interval between stale job purges (default: 24 hours).
    pub purge_interval: Duration,
    /// Jobs not seen for this long are purged.
    pub retention: Duration,
    /// Crawl once right after startup.
    pub crawl_on_startup: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&SchedulerSettings::default())
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            crawl_interval: Duration::from_secs(settings.crawl_interval_secs.max(1)),
            purge_interval: Duration::from_secs(settings.purge_interval_secs.max(1)),
            retention: settings.retention(),
            crawl_on_startup: settings.crawl_on_startup,
        }
    }
}

/// Enqueues site scrapes and purges stale jobs on a timer.
#[derive(Clone)]
pub struct Scheduler {
    sites: Arc<dyn SiteConfigStore>,
    jobs: JobIngestService,
    queue: Arc<dyn TaskQueue>,
    metrics: Arc<Metrics>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a new scheduler.
    #[must_use]
    pub fn new(
        sites: Arc<dyn SiteConfigStore>,
        jobs: JobIngestService,
        queue: Arc<dyn TaskQueue>,
        metrics: Arc<Metrics>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            sites,
            jobs,
            queue,
            metrics,
            config,
        }
    }

    /// Spawn one scrape enqueue per active site onto `tracker`.
    ///
    /// Returns the number of sites dispatched. A failed enqueue is logged and
    /// does not affect the other sites.
    pub async fn crawl(&self, tracker: &TaskTracker) -> AppResult<usize> {
        let sites = self.sites.active_sites().await?;
        let count = sites.len();

        for site in sites {
            let queue = self.queue.clone();
            let metrics = self.metrics.clone();
            tracker.spawn(async move {
                let site_id = site.id;
                let site_name = site.site_name.clone();
                match queue.enqueue_scrape(ScrapeSitePayload::new(site)).await {
                    Ok(()) => {
                        Metrics::add(&metrics.sites_enqueued, 1);
                        tracing::debug!(site_id, site = %site_name, "Queued site scrape");
                    }
                    Err(e) => {
                        tracing::error!(site_id, site = %site_name, error = %e, "Failed to queue site scrape");
                    }
                }
            });
        }

        tracing::info!(sites = count, "Crawl cycle dispatched");
        Ok(count)
    }

    /// Delete jobs outside the retention window.
    pub async fn purge(&self) -> AppResult<u64> {
        let deleted = self.jobs.purge_stale(self.config.retention).await?;
        Metrics::add(&self.metrics.jobs_purged, deleted);
        if deleted > 0 {
            tracing::info!(
                count = deleted,
                retention_hours = self.config.retention.as_secs() / 3600,
                "Purged stale jobs"
            );
        }
        Ok(deleted)
    }

    /// Run both tickers until `shutdown` is cancelled, then wait for in-flight enqueues.
    pub async fn run(&self, shutdown: CancellationToken) {
        let tracker = TaskTracker::new();

        let mut crawl_ticker = if self.config.crawl_on_startup {
            interval(self.config.crawl_interval)
        } else {
            interval_at(Instant::now() + self.config.crawl_interval, self.config.crawl_interval)
        };
        crawl_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut purge_ticker =
            interval_at(Instant::now() + self.config.purge_interval, self.config.purge_interval);
        purge_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            crawl_interval_secs = self.config.crawl_interval.as_secs(),
            purge_interval_secs = self.config.purge_interval.as_secs(),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = crawl_ticker.tick() => {
                    if let Err(e) = self.crawl(&tracker).await {
                        tracing::error!(error = %e, "Failed to list active sites");
                    }
                }
                _ = purge_ticker.tick() => {
                    if let Err(e) = self.purge().await {
                        tracing::error!(error = %e, "Failed to purge stale jobs");
                    }
                }
            }
        }

        tracker.close();
        tracker.wait().await;
        tracing::info!("Scheduler stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{MemorySites, RecordingQueue, StaleJobs, site};
    use std::sync::atomic::Ordering;

    fn scheduler(
        sites: MemorySites,
        queue: Arc<RecordingQueue>,
        config: SchedulerConfig,
    ) -> (Scheduler, Arc<StaleJobs>, Arc<Metrics>) {
        let jobs = Arc::new(StaleJobs::default());
        let metrics = Arc::new(Metrics::new());
        (
            Scheduler::new(
                Arc::new(sites),
                JobIngestService::new(jobs.clone()),
                queue,
                metrics.clone(),
                config,
            ),
            jobs,
            metrics,
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.crawl_interval, Duration::from_secs(3600));
        assert_eq!(config.purge_interval, Duration::from_secs(86_400));
        assert_eq!(config.retention, Duration::from_secs(24 * 3600));
        assert!(config.crawl_on_startup);
    }

    #[tokio::test]
    async fn test_crawl_isolates_enqueue_failures() {
        let queue = Arc::new(RecordingQueue::default());
        queue.failing_sites.lock().unwrap().push(2);
        let (scheduler, _, metrics) = scheduler(
            MemorySites::new(vec![site(1), site(2), site(3)]),
            queue.clone(),
            SchedulerConfig::default(),
        );
        let tracker = TaskTracker::new();

        assert_eq!(scheduler.crawl(&tracker).await.unwrap(), 3);
        tracker.close();
        tracker.wait().await;

        let mut ids: Vec<_> = queue.scrapes.lock().unwrap().iter().map(|p| p.site_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(metrics.sites_enqueued.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_payload_carries_site_config() {
        let queue = Arc::new(RecordingQueue::default());
        let (scheduler, _, _) = scheduler(
            MemorySites::new(vec![site(7)]),
            queue.clone(),
            SchedulerConfig::default(),
        );
        let tracker = TaskTracker::new();
        scheduler.crawl(&tracker).await.unwrap();
        tracker.close();
        tracker.wait().await;

        let scrapes = queue.scrapes.lock().unwrap();
        assert_eq!(scrapes[0].site_id, 7);
        assert_eq!(scrapes[0].config, site(7));
    }

    #[tokio::test]
    async fn test_purge_uses_retention() {
        let (scheduler, jobs, metrics) = scheduler(
            MemorySites::default(),
            Arc::default(),
            SchedulerConfig::default(),
        );
        jobs.stale.store(4, Ordering::SeqCst);

        assert_eq!(scheduler.purge().await.unwrap(), 4);
        assert_eq!(
            jobs.retentions.lock().unwrap().as_slice(),
            [Duration::from_secs(24 * 3600)]
        );
        assert_eq!(metrics.jobs_purged.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn test_run_crawls_on_startup_and_stops() {
        let queue = Arc::new(RecordingQueue::default());
        let (scheduler, jobs, _) = scheduler(
            MemorySites::new(vec![site(1), site(2)]),
            queue.clone(),
            SchedulerConfig::default(),
        );
        let token = CancellationToken::new();

        let handle = tokio::spawn({
            let token = token.clone();
            async move { scheduler.run(token).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(queue.scrapes.lock().unwrap().len(), 2);
        assert!(jobs.retentions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_without_startup_crawl() {
        let queue = Arc::new(RecordingQueue::default());
        let config = SchedulerConfig {
            crawl_on_startup: false,
            ..SchedulerConfig::default()
        };
        let (scheduler, _, _) = scheduler(MemorySites::new(vec![site(1)]), queue.clone(), config);
        let token = CancellationToken::new();

        let handle = tokio::spawn({
            let token = token.clone();
            async move { scheduler.run(token).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(queue.scrapes.lock().unwrap().is_empty());
    }
}
