//! Archived task monitor.

use std::sync::Arc;

use scrapjobs_common::Metrics;
use scrapjobs_core::SmtpMailer;
use scrapjobs_queue::{
    AlertSender, ArchiveMonitor, EmailAlertSender, QueueStorages, RedisAlertSet,
    RedisFailureLog, RedisQueueInspector,
};
use scrapjobs_server::{
    connect_redis, init_tracing, load_config, shutdown_token, spawn_metrics_server,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting scrapjobs archive monitor...");

    let config = load_config()?;
    let storages = QueueStorages::connect(&config.redis.url).await?;
    let redis = connect_redis(&config.redis.url).await?;
    info!("Connected to Redis");

    let alerts: Option<Arc<dyn AlertSender>> =
        match (config.monitor.alerts_enabled, &config.monitor.admin_email) {
            (true, Some(admin)) => Some(Arc::new(EmailAlertSender::new(
                SmtpMailer::from_settings(&config.email)?,
                admin.clone(),
            ))),
            (true, None) => {
                warn!("monitor.alerts_enabled is set without monitor.admin_email; only publishing depths");
                None
            }
            (false, _) => None,
        };

    let failures = Arc::new(RedisFailureLog::new(
        redis.clone(),
        config.redis.failure_log_key.clone(),
        config.monitor.alert_ttl_secs,
    ));
    let metrics = Arc::new(Metrics::new());
    let monitor = ArchiveMonitor::new(
        Arc::new(RedisQueueInspector::new(&storages, failures)),
        Arc::new(RedisAlertSet::new(redis, config.redis.alert_set_key.clone())),
        alerts,
        metrics.clone(),
        metrics.clone(),
        config.monitor.clone(),
    );

    let shutdown = shutdown_token();
    spawn_metrics_server(&config, metrics, shutdown.clone());

    monitor.run(shutdown).await;
    info!("Archive monitor shutdown complete");
    Ok(())
}
