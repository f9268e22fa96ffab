//! Last failure of each task.
//!
//! Workers record the error of every failed attempt so an archived task can
//! be reported with what finally killed it.

use std::collections::HashMap;
use std::sync::Arc;

use apalis::prelude::{Error, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fred::clients::Client as RedisClient;
use fred::interfaces::{HashesInterface, KeysInterface};
use scrapjobs_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::tasks::TaskKind;
use crate::workers::into_worker_error;

/// The most recent failed attempt of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Error message of the attempt.
    pub error: String,
    /// When the attempt failed.
    pub failed_at: DateTime<Utc>,
}

/// Storage of task failures, keyed by task id.
#[async_trait]
pub trait FailureLog: Send + Sync {
    /// Replace the recorded failure of `task_id`.
    async fn record(&self, task_id: &str, failure: &TaskFailure) -> AppResult<()>;

    /// Recorded failures of the given tasks; unknown ids are absent.
    async fn last_failures(&self, task_ids: &[String]) -> AppResult<HashMap<String, TaskFailure>>;
}

/// Failure log stored in one Redis hash whose TTL is refreshed on every write.
#[derive(Clone)]
pub struct RedisFailureLog {
    redis: Arc<RedisClient>,
    key: String,
    ttl_secs: i64,
}

impl RedisFailureLog {
    /// Create a new failure log stored under `key`.
    #[must_use]
    pub const fn new(redis: Arc<RedisClient>, key: String, ttl_secs: i64) -> Self {
        Self { redis, key, ttl_secs }
    }
}

#[async_trait]
impl FailureLog for RedisFailureLog {
    async fn record(&self, task_id: &str, failure: &TaskFailure) -> AppResult<()> {
        let value = serde_json::to_string(failure)?;
        let _: i64 = self
            .redis
            .hset(self.key.as_str(), (task_id, value))
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        let _: bool = self
            .redis
            .expire(self.key.as_str(), self.ttl_secs, None)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        Ok(())
    }

    async fn last_failures(&self, task_ids: &[String]) -> AppResult<HashMap<String, TaskFailure>> {
        if task_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let values: Vec<Option<String>> = self
            .redis
            .hmget(self.key.as_str(), task_ids.to_vec())
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;

        Ok(task_ids
            .iter()
            .zip(values)
            .filter_map(|(id, value)| {
                let failure = serde_json::from_str(&value?)
                    .inspect_err(|e| tracing::debug!(task_id = %id, error = %e, "Unreadable failure record"))
                    .ok()?;
                Some((id.clone(), failure))
            })
            .collect())
    }
}

/// Turns handler errors into apalis errors, recording each one.
#[derive(Clone)]
pub struct FailureRecorder {
    log: Arc<dyn FailureLog>,
}

impl FailureRecorder {
    /// Create a recorder writing to `log`.
    #[must_use]
    pub fn new(log: Arc<dyn FailureLog>) -> Self {
        Self { log }
    }

    /// Record a failed attempt of `task_id` and wrap the error for apalis.
    ///
    /// A failure to record is logged and does not change the outcome.
    pub async fn fail(&self, kind: TaskKind, task_id: &TaskId, subject: i32, err: AppError) -> Error {
        let failure = TaskFailure {
            error: err.to_string(),
            failed_at: Utc::now(),
        };
        let id = task_id.to_string();
        if let Err(e) = self.log.record(&id, &failure).await {
            tracing::warn!(task = kind.type_name(), task_id = %id, error = %e, "Failed to record task failure");
        }
        into_worker_error(kind.type_name(), subject, err)
    }
}
