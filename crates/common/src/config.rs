//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Worker pool configuration.
    #[serde(default)]
    pub worker: WorkerSettings,
    /// Scraper configuration.
    #[serde(default)]
    pub scraper: ScraperSettings,
    /// AI analysis backend configuration.
    pub ai: AiSettings,
    /// Outgoing email configuration.
    pub email: EmailSettings,
    /// Archive monitor configuration.
    #[serde(default)]
    pub monitor: MonitorSettings,
    /// Metrics endpoint configuration.
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending migrations on startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key of the set holding ids of archived tasks that were already alerted.
    #[serde(default = "default_alert_set_key")]
    pub alert_set_key: String,
    /// Key of the hash holding the last failure of each task.
    #[serde(default = "default_failure_log_key")]
    pub failure_log_key: String,
}

/// Crawl and purge scheduling.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Seconds between crawl cycles.
    #[serde(default = "default_crawl_interval")]
    pub crawl_interval_secs: u64,
    /// Seconds between stale-job purges.
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
    /// Jobs not seen for this many hours are purged.
    #[serde(default = "default_retention_hours")]
    pub job_retention_hours: u64,
    /// Run one crawl immediately at startup.
    #[serde(default = "default_true")]
    pub crawl_on_startup: bool,
}

/// Relative weights of the priority tiers.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueWeights {
    /// Weight of the critical tier.
    #[serde(default = "default_critical_weight")]
    pub critical: u32,
    /// Weight of the default tier.
    #[serde(default = "default_default_weight")]
    pub default: u32,
    /// Weight of the low tier.
    #[serde(default = "default_low_weight")]
    pub low: u32,
}

/// Task worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    /// Total number of concurrently executing tasks per process.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Priority tier weights used to split `concurrency`.
    #[serde(default)]
    pub queues: QueueWeights,
    /// Retry budget for every pipeline stage.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Deadline of one scrape.
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,
    /// Deadline of one analysis, including the wait for a rate limit token.
    #[serde(default = "default_analyze_timeout")]
    pub analyze_timeout_secs: u64,
    /// Deadline of one notification.
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_secs: u64,
}

/// HTTP and headless scraping configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperSettings {
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Detail pages fetched in parallel per scrape.
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,
    /// Upper bound on listing pages followed per scrape.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Requests allowed per host within one window.
    #[serde(default = "default_host_max_requests")]
    pub host_max_requests: u32,
    /// Length of the per-host window.
    #[serde(default = "default_host_window")]
    pub host_window_secs: u64,
    /// Browserless endpoint used by the headless strategy.
    #[serde(default)]
    pub browserless_url: Option<String>,
    /// Browserless API token.
    #[serde(default)]
    pub browserless_token: Option<String>,
}

/// Text generation backend used for resume analysis.
#[derive(Debug, Clone, Deserialize)]
pub struct AiSettings {
    /// API base URL.
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// API key.
    pub api_key: String,
    /// Sustained request rate.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Requests allowed back to back before throttling kicks in.
    #[serde(default = "default_burst")]
    pub burst: u32,
    /// HTTP timeout for one generation call.
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

/// SMTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// Sender address.
    pub from_address: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

/// Archived task monitor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    /// Seconds between inspections.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// How long an alerted task id is remembered.
    #[serde(default = "default_alert_ttl")]
    pub alert_ttl_secs: i64,
    /// Queues to inspect.
    #[serde(default = "default_monitored_queues")]
    pub queues: Vec<String>,
    /// Send one alert per newly archived task.
    #[serde(default = "default_true")]
    pub alerts_enabled: bool,
    /// Alert recipient.
    #[serde(default)]
    pub admin_email: Option<String>,
    /// Upper bound on archived-task pages read per queue and poll.
    #[serde(default = "default_archive_pages")]
    pub max_pages: i32,
}

/// Prometheus endpoint configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Address to serve `/metrics` and `/health` on. Disabled when unset.
    #[serde(default)]
    pub listen_addr: Option<String>,
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_true() -> bool {
    true
}

fn default_failure_log_key() -> String {
    "scrapjobs:task_failures".to_string()
}

fn default_alert_set_key() -> String {
    "scrapjobs:archived_alerted".to_string()
}

const fn default_crawl_interval() -> u64 {
    3600
}

const fn default_purge_interval() -> u64 {
    86_400
}

const fn default_retention_hours() -> u64 {
    24
}

const fn default_critical_weight() -> u32 {
    6
}

const fn default_default_weight() -> u32 {
    3
}

const fn default_low_weight() -> u32 {
    1
}

const fn default_concurrency() -> u32 {
    10
}

const fn default_max_retries() -> usize {
    3
}

const fn default_scrape_timeout() -> u64 {
    300
}

const fn default_analyze_timeout() -> u64 {
    120
}

const fn default_notify_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; scrapjobs/0.1)".to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_detail_concurrency() -> usize {
    8
}

const fn default_max_pages() -> usize {
    50
}

const fn default_host_max_requests() -> u32 {
    60
}

const fn default_host_window() -> u64 {
    60
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_model() -> String {
    "gemini-1.5-flash".to_string()
}

const fn default_requests_per_minute() -> u32 {
    10
}

const fn default_burst() -> u32 {
    2
}

const fn default_ai_timeout() -> u64 {
    60
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "ScrapJobs".to_string()
}

const fn default_poll_interval() -> u64 {
    300
}

const fn default_alert_ttl() -> i64 {
    168 * 3600
}

fn default_monitored_queues() -> Vec<String> {
    ["scrape:site", "process:results", "analyze:resume", "notify:user"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_archive_pages() -> i32 {
    100
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            crawl_interval_secs: default_crawl_interval(),
            purge_interval_secs: default_purge_interval(),
            job_retention_hours: default_retention_hours(),
            crawl_on_startup: true,
        }
    }
}

impl SchedulerSettings {
    /// Retention window as a duration.
    #[must_use]
    pub const fn retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_hours * 3600)
    }
}

impl Default for QueueWeights {
    fn default() -> Self {
        Self {
            critical: default_critical_weight(),
            default: default_default_weight(),
            low: default_low_weight(),
        }
    }
}

impl QueueWeights {
    fn total(&self) -> u32 {
        self.critical + self.default + self.low
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queues: QueueWeights::default(),
            max_retries: default_max_retries(),
            scrape_timeout_secs: default_scrape_timeout(),
            analyze_timeout_secs: default_analyze_timeout(),
            notify_timeout_secs: default_notify_timeout(),
        }
    }
}

impl WorkerSettings {
    /// Share of `concurrency` given to a tier of the given weight, at least one.
    #[must_use]
    pub fn concurrency_for_weight(&self, weight: u32) -> usize {
        let total = self.queues.total().max(1);
        let share = (u64::from(self.concurrency) * u64::from(weight)) / u64::from(total);
        share.max(1) as usize
    }
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            detail_concurrency: default_detail_concurrency(),
            max_pages: default_max_pages(),
            host_max_requests: default_host_max_requests(),
            host_window_secs: default_host_window(),
            browserless_url: None,
            browserless_token: None,
        }
    }
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            api_key: String::new(),
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            alert_ttl_secs: default_alert_ttl(),
            queues: default_monitored_queues(),
            alerts_enabled: true,
            admin_email: None,
            max_pages: default_archive_pages(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `SCRAPJOBS_ENV`)
    /// 4. Environment variables with `SCRAPJOBS__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("SCRAPJOBS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SCRAPJOBS")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("monitor.queues"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("SCRAPJOBS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
