//! Crawl scheduler: enqueues site scrapes and purges stale jobs.

use std::sync::Arc;

use scrapjobs_common::Metrics;
use scrapjobs_core::JobIngestService;
use scrapjobs_db::repositories::{JobRepository, SiteConfigRepository};
use scrapjobs_queue::{QueueStorages, RedisTaskQueue, Scheduler, SchedulerConfig};
use scrapjobs_server::{
    connect_database, init_tracing, load_config, shutdown_token, spawn_metrics_server,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting scrapjobs scheduler...");

    let config = load_config()?;
    let db = connect_database(&config).await?;
    let storages = QueueStorages::connect(&config.redis.url).await?;
    info!("Connected to Redis job queue");

    let metrics = Arc::new(Metrics::new());
    let scheduler = Scheduler::new(
        Arc::new(SiteConfigRepository::new(db.clone())),
        JobIngestService::new(Arc::new(JobRepository::new(db))),
        Arc::new(RedisTaskQueue::new(storages)),
        metrics.clone(),
        SchedulerConfig::from(&config.scheduler),
    );

    let shutdown = shutdown_token();
    spawn_metrics_server(&config, metrics, shutdown.clone());

    scheduler.run(shutdown).await;
    info!("Scheduler shutdown complete");
    Ok(())
}
