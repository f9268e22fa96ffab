//! Archived (dead) task monitor.
//!
//! Publishes the archived depth of every monitored queue and, when alerts are
//! enabled, sends one alert per newly archived task. Task ids that were
//! alerted are remembered in a TTL'd set so each task is reported once.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use scrapjobs_common::config::MonitorSettings;
use scrapjobs_common::{AppResult, Metrics};
use scrapjobs_core::services::email::{EmailMessage, SmtpMailer, escape_html, wrap_html};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Metric name of the archived depth gauge.
pub const ARCHIVED_DEPTH_METRIC: &str = "archived_queue_depth";

/// A task that exhausted its retries.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedTask {
    pub id: String,
    /// Task type name.
    pub kind: String,
    pub queue: String,
    pub attempts: usize,
    pub payload: Value,
    /// Error of the final attempt, when one was recorded.
    pub last_error: Option<String>,
    pub failed_at: Option<DateTime<Utc>>,
}

/// Read access to archived tasks.
#[async_trait]
pub trait QueueInspector: Send + Sync {
    /// Number of archived tasks in the queue.
    async fn archived_count(&self, queue: &str) -> AppResult<u64>;

    /// One page of archived tasks, starting at page 1. An empty page ends the listing.
    async fn archived_tasks(&self, queue: &str, page: i32) -> AppResult<Vec<ArchivedTask>>;
}

/// The "already alerted" set.
#[async_trait]
pub trait AlertDedupStore: Send + Sync {
    /// The subset of `ids` that were alerted before.
    async fn alerted(&self, ids: &[String]) -> AppResult<HashSet<String>>;

    /// Remember `ids` for `ttl_secs`.
    async fn mark_alerted(&self, ids: &[String], ttl_secs: i64) -> AppResult<()>;
}

/// Delivers archived-task alerts.
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send_alert(&self, task: &ArchivedTask) -> AppResult<()>;
}

/// Accepts `(metric, value, dimensions)` samples.
pub trait MetricsSink: Send + Sync {
    fn publish(&self, metric: &str, value: f64, dimensions: &[(&str, &str)]);
}

impl MetricsSink for Metrics {
    fn publish(&self, metric: &str, value: f64, dimensions: &[(&str, &str)]) {
        self.set_gauge(metric, dimensions, value);
        tracing::info!(target: "metrics", metric, value, dimensions = ?dimensions, "gauge");
    }
}

/// Alerts by email.
pub struct EmailAlertSender {
    mailer: SmtpMailer,
    recipient: String,
}

impl EmailAlertSender {
    /// Create a new email alert sender.
    #[must_use]
    pub const fn new(mailer: SmtpMailer, recipient: String) -> Self {
        Self { mailer, recipient }
    }
}

/// Render the alert email for an archived task.
#[must_use]
pub fn render_alert(recipient: &str, task: &ArchivedTask) -> EmailMessage {
    let payload = serde_json::to_string_pretty(&task.payload).unwrap_or_else(|_| task.payload.to_string());
    let last_error = task.last_error.as_deref().unwrap_or("unknown");
    let failed_at = task.failed_at.map_or_else(
        || "unknown".to_string(),
        |at| at.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    let subject = format!("Archived task: {} {}", task.kind, task.id);
    let text_body = format!(
        "A task exhausted its retries.\n\nID: {}\nType: {}\nQueue: {}\nAttempts: {}\n\
         Failed at: {}\nLast error: {}\n\nPayload:\n{}\n",
        task.id, task.kind, task.queue, task.attempts, failed_at, last_error, payload
    );
    let html_body = wrap_html(&format!(
        "<h2>Archived task</h2>\
         <p><strong>ID:</strong> {}<br><strong>Type:</strong> {}<br>\
         <strong>Queue:</strong> {}<br><strong>Attempts:</strong> {}<br>\
         <strong>Failed at:</strong> {}</p>\
         <p><strong>Last error:</strong></p><pre>{}</pre>\
         <p><strong>Payload:</strong></p><pre>{}</pre>",
        escape_html(&task.id),
        escape_html(&task.kind),
        escape_html(&task.queue),
        task.attempts,
        escape_html(&failed_at),
        escape_html(last_error),
        escape_html(&payload)
    ));

    EmailMessage {
        to: recipient.to_string(),
        subject,
        text_body,
        html_body,
    }
}

#[async_trait]
impl AlertSender for EmailAlertSender {
    async fn send_alert(&self, task: &ArchivedTask) -> AppResult<()> {
        self.mailer.send(render_alert(&self.recipient, task)).await
    }
}

/// Periodic archived-task inspection.
pub struct ArchiveMonitor {
    inspector: Arc<dyn QueueInspector>,
    dedup: Arc<dyn AlertDedupStore>,
    alerts: Option<Arc<dyn AlertSender>>,
    sink: Arc<dyn MetricsSink>,
    metrics: Arc<Metrics>,
    settings: MonitorSettings,
}

impl ArchiveMonitor {
    /// Create a new monitor. Without an alert sender only depths are published.
    #[must_use]
    pub fn new(
        inspector: Arc<dyn QueueInspector>,
        dedup: Arc<dyn AlertDedupStore>,
        alerts: Option<Arc<dyn AlertSender>>,
        sink: Arc<dyn MetricsSink>,
        metrics: Arc<Metrics>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            inspector,
            dedup,
            alerts,
            sink,
            metrics,
            settings,
        }
    }

    /// Inspect every monitored queue once.
    pub async fn poll_once(&self) {
        for queue in &self.settings.queues {
            if let Err(e) = self.check_queue(queue).await {
                warn!(queue = %queue, error = %e, "Archive check failed");
            }
        }
    }

    async fn check_queue(&self, queue: &str) -> AppResult<()> {
        let depth = match self.inspector.archived_count(queue).await {
            Ok(depth) => depth,
            Err(e) => {
                warn!(queue, error = %e, "Failed to read archived depth");
                0
            }
        };
        self.sink
            .publish(ARCHIVED_DEPTH_METRIC, depth as f64, &[("queue", queue)]);

        let Some(alerts) = self.alerts.as_ref().filter(|_| self.settings.alerts_enabled) else {
            return Ok(());
        };
        if depth == 0 {
            return Ok(());
        }

        let mut sent_total = 0usize;
        for page in 1..=self.settings.max_pages.max(1) {
            let tasks = self.inspector.archived_tasks(queue, page).await?;
            if tasks.is_empty() {
                break;
            }

            let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
            let alerted = self.dedup.alerted(&ids).await?;

            let mut sent = Vec::new();
            for task in tasks.iter().filter(|t| !alerted.contains(&t.id)) {
                match alerts.send_alert(task).await {
                    Ok(()) => sent.push(task.id.clone()),
                    Err(e) => warn!(queue, task_id = %task.id, error = %e, "Failed to send archive alert"),
                }
            }

            if !sent.is_empty() {
                self.dedup
                    .mark_alerted(&sent, self.settings.alert_ttl_secs)
                    .await?;
                Metrics::add(&self.metrics.archive_alerts_sent, sent.len() as u64);
                sent_total += sent.len();
            }
        }

        if sent_total > 0 {
            info!(queue, depth, alerts = sent_total, "Sent archived task alerts");
        } else {
            debug!(queue, depth, "No new archived tasks");
        }
        Ok(())
    }

    /// Poll until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.settings.poll_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(queues = ?self.settings.queues, "Archive monitor started");
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => self.poll_once().await,
            }
        }
        info!("Archive monitor stopped");
    }
}
