//! Per-host request throttling.
//!
//! Caps how many requests a process sends to one host within a window so a
//! crawl with many detail pages does not hammer a careers site. Hosts idle
//! for two windows are forgotten once enough hosts are tracked.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use scrapjobs_common::config::ScraperSettings;
use tokio::sync::RwLock;

/// Tracked hosts above which idle windows are pruned on insert.
const PRUNE_AT: usize = 32;

/// Throttle configuration.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Time window duration.
    pub window: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

impl From<&ScraperSettings> for ThrottleConfig {
    fn from(settings: &ScraperSettings) -> Self {
        Self {
            max_requests: settings.host_max_requests.max(1),
            window: Duration::from_secs(settings.host_window_secs.max(1)),
        }
    }
}

/// Window state for a single host.
#[derive(Debug, Clone)]
struct HostWindow {
    count: u32,
    window_start: Instant,
}

impl HostWindow {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }
}

/// Throttle check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Request may go out now.
    Allowed,
    /// Host is saturated for the current window.
    Limited {
        /// Time until the window resets.
        retry_after: Duration,
    },
}

/// Keyed fixed-window limiter shared by the fetchers of a process.
#[derive(Clone)]
pub struct HostThrottle {
    config: ThrottleConfig,
    hosts: Arc<RwLock<HashMap<String, HostWindow>>>,
}

impl HostThrottle {
    /// Create a new throttle with the given configuration.
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            hosts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Take a slot for `host` if one is free.
    pub async fn check(&self, host: &str) -> ThrottleDecision {
        let mut hosts = self.hosts.write().await;
        let now = Instant::now();

        if hosts.len() >= PRUNE_AT && !hosts.contains_key(host) {
            let idle_after = self.config.window * 2;
            let before = hosts.len();
            hosts.retain(|_, state| now.duration_since(state.window_start) < idle_after);
            tracing::debug!(pruned = before - hosts.len(), "Pruned idle host windows");
        }

        let state = hosts
            .entry(host.to_string())
            .or_insert_with(|| HostWindow::new(now));

        if now.duration_since(state.window_start) >= self.config.window {
            state.count = 0;
            state.window_start = now;
        }

        if state.count >= self.config.max_requests {
            let retry_after = self
                .config
                .window
                .saturating_sub(now.duration_since(state.window_start));
            return ThrottleDecision::Limited { retry_after };
        }

        state.count += 1;
        ThrottleDecision::Allowed
    }

    /// Wait until a slot for `host` is free and take it.
    pub async fn acquire(&self, host: &str) {
        loop {
            match self.check(host).await {
                ThrottleDecision::Allowed => return,
                ThrottleDecision::Limited { retry_after } => {
                    tracing::debug!(host, ?retry_after, "Host throttled, waiting");
                    tokio::time::sleep(retry_after.max(Duration::from_millis(10))).await;
                }
            }
        }
    }

    #[cfg(test)]
    async fn host_count(&self) -> usize {
        self.hosts.read().await.len()
    }
}

impl Default for HostThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_limit() {
        let throttle = HostThrottle::new(ThrottleConfig {
            max_requests: 3,
            window: Duration::from_secs(60),
        });

        for _ in 0..3 {
            assert_eq!(throttle.check("jobs.example").await, ThrottleDecision::Allowed);
        }
        assert!(matches!(
            throttle.check("jobs.example").await,
            ThrottleDecision::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn test_hosts_are_independent() {
        let throttle = HostThrottle::new(ThrottleConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
        });

        assert_eq!(throttle.check("a.example").await, ThrottleDecision::Allowed);
        assert_eq!(throttle.check("b.example").await, ThrottleDecision::Allowed);
        assert_eq!(throttle.host_count().await, 2);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_next_window() {
        let throttle = HostThrottle::new(ThrottleConfig {
            max_requests: 1,
            window: Duration::from_millis(50),
        });

        throttle.acquire("jobs.example").await;
        let started = Instant::now();
        throttle.acquire("jobs.example").await;
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_new_host_prunes_idle_hosts() {
        let throttle = HostThrottle::new(ThrottleConfig {
            max_requests: 5,
            window: Duration::from_millis(10),
        });

        for i in 0..PRUNE_AT {
            throttle.check(&format!("site{i}.example")).await;
        }
        assert_eq!(throttle.host_count().await, PRUNE_AT);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(throttle.check("fresh.example").await, ThrottleDecision::Allowed);
        assert_eq!(throttle.host_count().await, 1);
    }

    #[tokio::test]
    async fn test_active_hosts_survive_pruning() {
        let throttle = HostThrottle::new(ThrottleConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
        });

        for i in 0..PRUNE_AT {
            throttle.check(&format!("site{i}.example")).await;
        }
        throttle.check("fresh.example").await;

        assert_eq!(throttle.host_count().await, PRUNE_AT + 1);
        assert!(matches!(
            throttle.check("site0.example").await,
            ThrottleDecision::Limited { .. }
        ));
    }
}
