//! Redis set of already alerted task ids.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use fred::clients::Client as RedisClient;
use fred::interfaces::{KeysInterface, SetsInterface};
use scrapjobs_common::{AppError, AppResult};

use crate::monitor::AlertDedupStore;

/// Alerted task ids, stored in one Redis set whose TTL is refreshed on every write.
#[derive(Clone)]
pub struct RedisAlertSet {
    redis: Arc<RedisClient>,
    key: String,
}

impl RedisAlertSet {
    /// Create a new alert set stored under `key`.
    #[must_use]
    pub const fn new(redis: Arc<RedisClient>, key: String) -> Self {
        Self { redis, key }
    }
}

#[async_trait]
impl AlertDedupStore for RedisAlertSet {
    async fn alerted(&self, ids: &[String]) -> AppResult<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let flags: Vec<bool> = self
            .redis
            .smismember(self.key.as_str(), ids.to_vec())
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;

        Ok(ids
            .iter()
            .zip(flags)
            .filter_map(|(id, member)| member.then(|| id.clone()))
            .collect())
    }

    async fn mark_alerted(&self, ids: &[String], ttl_secs: i64) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let _: i64 = self
            .redis
            .sadd(self.key.as_str(), ids.to_vec())
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        let _: bool = self
            .redis
            .expire(self.key.as_str(), ttl_secs, None)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;

        tracing::debug!(key = %self.key, count = ids.len(), ttl_secs, "Marked tasks as alerted");
        Ok(())
    }
}
