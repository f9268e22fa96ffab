//! Pipeline worker: consumes every task type.

use std::sync::Arc;
use std::time::Duration;

use scrapjobs_common::Metrics;
use scrapjobs_core::{
    AiResumeAnalyzer, GeminiClient, JobIngestService, MatchFinder, NotificationService,
    RateLimitedAnalyzer, SmtpMailer,
};
use scrapjobs_db::repositories::{
    JobNotificationRepository, JobRepository, PlanRepository, SubscriptionRepository,
};
use scrapjobs_queue::{
    AnalyzeHandler, FailureRecorder, Handlers, NotifyHandler, ProcessResultsHandler,
    QueueStorages, RedisFailureLog, RedisTaskQueue, ScrapeHandler, TaskQueue, build_monitor,
};
use scrapjobs_scraper::ScraperFactory;
use scrapjobs_server::{
    connect_database, connect_redis, init_tracing, load_config, shutdown_signal,
    spawn_metrics_server,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting scrapjobs worker...");

    let config = load_config()?;
    let db = connect_database(&config).await?;

    info!("Connecting to Redis...");
    let storages = QueueStorages::connect(&config.redis.url).await?;
    let queue: Arc<dyn TaskQueue> = Arc::new(RedisTaskQueue::new(storages.clone()));
    let failures = FailureRecorder::new(Arc::new(RedisFailureLog::new(
        connect_redis(&config.redis.url).await?,
        config.redis.failure_log_key.clone(),
        config.monitor.alert_ttl_secs,
    )));
    info!("Connected to Redis job queue");

    let metrics = Arc::new(Metrics::new());
    let notification_repo = Arc::new(JobNotificationRepository::new(db.clone()));

    let scrapers = ScraperFactory::from_settings(&config.scraper)?;
    let ingest = JobIngestService::new(Arc::new(JobRepository::new(db.clone())));
    let matcher = MatchFinder::new(
        Arc::new(SubscriptionRepository::new(db.clone())),
        notification_repo.clone(),
        Arc::new(PlanRepository::new(db.clone())),
    );

    let generator = GeminiClient::from_settings(&config.ai)?;
    let analyzer = AiResumeAnalyzer::new(Arc::new(generator));
    let analyzer = RateLimitedAnalyzer::from_settings(Arc::new(analyzer), &config.ai)?;
    let mailer = SmtpMailer::from_settings(&config.email)?;
    let notifications = NotificationService::new(notification_repo, Arc::new(mailer));

    let worker = &config.worker;
    let handlers = Handlers {
        scrape: ScrapeHandler::new(
            scrapers,
            ingest,
            queue.clone(),
            metrics.clone(),
            Duration::from_secs(worker.scrape_timeout_secs),
        ),
        results: ProcessResultsHandler::new(matcher, queue.clone(), metrics.clone()),
        analyze: AnalyzeHandler::new(
            Arc::new(analyzer),
            queue,
            metrics.clone(),
            Duration::from_secs(worker.analyze_timeout_secs),
        ),
        notify: NotifyHandler::new(
            notifications,
            metrics.clone(),
            Duration::from_secs(worker.notify_timeout_secs),
        ),
        failures,
    };

    let shutdown = CancellationToken::new();
    spawn_metrics_server(&config, metrics, shutdown.clone());

    info!(concurrency = worker.concurrency, "Workers starting");
    build_monitor(&storages, handlers, worker)
        .run_with_signal(async {
            shutdown_signal().await;
            Ok(())
        })
        .await?;

    shutdown.cancel();
    info!("Worker shutdown complete");
    Ok(())
}
