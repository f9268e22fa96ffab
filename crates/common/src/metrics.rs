//! Metrics collection for scrapjobs.
//!
//! Counters track the flow of work through the pipeline; labelled gauges hold
//! point-in-time values such as archived queue depth.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

type GaugeKey = (String, Vec<(String, String)>);

/// Application metrics collector.
#[derive(Debug)]
pub struct Metrics {
    // === Scheduler ===
    /// Scrape tasks enqueued by the scheduler
    pub sites_enqueued: AtomicU64,
    /// Stale jobs removed by the purge
    pub jobs_purged: AtomicU64,

    // === Scraping ===
    /// Job candidates returned by scrapers
    pub jobs_scraped: AtomicU64,
    /// Jobs persisted for the first time
    pub jobs_inserted: AtomicU64,
    /// Scrapes that ended in an error or a timeout
    pub scrape_failures: AtomicU64,

    // === Matching and analysis ===
    /// Analyze tasks enqueued by the match finder
    pub analyses_enqueued: AtomicU64,
    /// Analyses that returned a result
    pub analyses_completed: AtomicU64,
    /// Analyses that failed
    pub analyses_failed: AtomicU64,

    // === Notification ===
    /// Match emails sent
    pub notifications_sent: AtomicU64,
    /// Alerts sent for archived tasks
    pub archive_alerts_sent: AtomicU64,

    gauges: RwLock<BTreeMap<GaugeKey, f64>>,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sites_enqueued: AtomicU64::new(0),
            jobs_purged: AtomicU64::new(0),
            jobs_scraped: AtomicU64::new(0),
            jobs_inserted: AtomicU64::new(0),
            scrape_failures: AtomicU64::new(0),
            analyses_enqueued: AtomicU64::new(0),
            analyses_completed: AtomicU64::new(0),
            analyses_failed: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            archive_alerts_sent: AtomicU64::new(0),
            gauges: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add `n` to a counter.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Record the outcome of one scrape.
    pub fn record_scrape(&self, candidates: usize, inserted: usize) {
        Self::add(&self.jobs_scraped, candidates as u64);
        Self::add(&self.jobs_inserted, inserted as u64);
    }

    /// Record a finished analysis.
    pub fn record_analysis(&self, success: bool) {
        if success {
            Self::add(&self.analyses_completed, 1);
        } else {
            Self::add(&self.analyses_failed, 1);
        }
    }

    /// Set a labelled gauge.
    pub fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let mut labels: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        labels.sort();

        self.gauges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((name.to_string(), labels), value);
    }

    /// Read a labelled gauge.
    #[must_use]
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let mut labels: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        labels.sort();

        self.gauges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(name.to_string(), labels))
            .copied()
    }

    /// Get a snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sites_enqueued: self.sites_enqueued.load(Ordering::Relaxed),
            jobs_purged: self.jobs_purged.load(Ordering::Relaxed),
            jobs_scraped: self.jobs_scraped.load(Ordering::Relaxed),
            jobs_inserted: self.jobs_inserted.load(Ordering::Relaxed),
            scrape_failures: self.scrape_failures.load(Ordering::Relaxed),
            analyses_enqueued: self.analyses_enqueued.load(Ordering::Relaxed),
            analyses_completed: self.analyses_completed.load(Ordering::Relaxed),
            analyses_failed: self.analyses_failed.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            archive_alerts_sent: self.archive_alerts_sent.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = String::new();

        let counters = [
            ("sites_enqueued_total", "Scrape tasks enqueued", snapshot.sites_enqueued),
            ("jobs_purged_total", "Stale jobs purged", snapshot.jobs_purged),
            ("jobs_scraped_total", "Job candidates scraped", snapshot.jobs_scraped),
            ("jobs_inserted_total", "New jobs stored", snapshot.jobs_inserted),
            ("scrape_failures_total", "Failed scrapes", snapshot.scrape_failures),
            ("analyses_enqueued_total", "Analyze tasks enqueued", snapshot.analyses_enqueued),
            ("analyses_completed_total", "Analyses completed", snapshot.analyses_completed),
            ("analyses_failed_total", "Analyses failed", snapshot.analyses_failed),
            ("notifications_sent_total", "Match emails sent", snapshot.notifications_sent),
            ("archive_alerts_sent_total", "Archived task alerts sent", snapshot.archive_alerts_sent),
        ];

        for (name, help, value) in counters {
            output.push_str(&format!("# HELP scrapjobs_{name} {help}\n"));
            output.push_str(&format!("# TYPE scrapjobs_{name} counter\n"));
            output.push_str(&format!("scrapjobs_{name} {value}\n"));
        }

        let gauges = self.gauges.read().unwrap_or_else(PoisonError::into_inner);
        let mut last_name: Option<&str> = None;
        for ((name, labels), value) in gauges.iter() {
            if last_name != Some(name.as_str()) {
                output.push_str(&format!("# TYPE scrapjobs_{name} gauge\n"));
                last_name = Some(name.as_str());
            }
            let rendered: Vec<String> = labels
                .iter()
                .map(|(k, v)| format!("{k}=\"{}\"", v.replace('"', "\\\"")))
                .collect();
            if rendered.is_empty() {
                output.push_str(&format!("scrapjobs_{name} {value}\n"));
            } else {
                output.push_str(&format!(
                    "scrapjobs_{name}{{{}}} {value}\n",
                    rendered.join(",")
                ));
            }
        }

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of all counters at a point in time.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub sites_enqueued: u64,
    pub jobs_purged: u64,
    pub jobs_scraped: u64,
    pub jobs_inserted: u64,
    pub scrape_failures: u64,
    pub analyses_enqueued: u64,
    pub analyses_completed: u64,
    pub analyses_failed: u64,
    pub notifications_sent: u64,
    pub archive_alerts_sent: u64,
}

/// Timer guard for measuring operation duration.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.jobs_scraped.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.notifications_sent.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_scrape() {
        let metrics = Metrics::new();

        metrics.record_scrape(10, 4);
        metrics.record_scrape(10, 0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_scraped, 20);
        assert_eq!(snapshot.jobs_inserted, 4);
    }

    #[test]
    fn test_record_analysis() {
        let metrics = Metrics::new();

        metrics.record_analysis(true);
        metrics.record_analysis(true);
        metrics.record_analysis(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.analyses_completed, 2);
        assert_eq!(snapshot.analyses_failed, 1);
    }

    #[test]
    fn test_gauge_overwrites_per_label_set() {
        let metrics = Metrics::new();

        metrics.set_gauge("archived_queue_depth", &[("queue", "scrape:site")], 3.0);
        metrics.set_gauge("archived_queue_depth", &[("queue", "scrape:site")], 7.0);
        metrics.set_gauge("archived_queue_depth", &[("queue", "notify:user")], 1.0);

        assert_eq!(
            metrics.gauge("archived_queue_depth", &[("queue", "scrape:site")]),
            Some(7.0)
        );
        assert_eq!(
            metrics.gauge("archived_queue_depth", &[("queue", "notify:user")]),
            Some(1.0)
        );
        assert_eq!(metrics.gauge("archived_queue_depth", &[("queue", "x")]), None);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        Metrics::add(&metrics.sites_enqueued, 3);
        metrics.set_gauge("archived_queue_depth", &[("queue", "scrape:site")], 7.0);

        let prometheus = metrics.to_prometheus();
        assert!(prometheus.contains("scrapjobs_sites_enqueued_total 3"));
        assert!(prometheus.contains("# TYPE scrapjobs_archived_queue_depth gauge"));
        assert!(prometheus.contains("scrapjobs_archived_queue_depth{queue=\"scrape:site\"} 7"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed() >= Duration::from_millis(10));
    }
}
