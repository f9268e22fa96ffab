//! Archived task inspection over apalis-redis storages.
//!
//! Dead tasks are joined with the failure log so each carries the error of
//! its final attempt.

use std::collections::HashMap;
use std::sync::Arc;

use apalis_core::backend::BackendExpose;
use apalis_core::request::State;
use apalis_redis::RedisStorage;
use async_trait::async_trait;
use scrapjobs_common::{AppError, AppResult};

use crate::enqueuer::QueueStorages;
use crate::failures::FailureLog;
use crate::monitor::{ArchivedTask, QueueInspector};
use crate::tasks::{Task, TaskKind};

/// Dead tasks of one storage.
#[async_trait]
trait DeadTasks: Send + Sync {
    async fn dead_count(&self) -> AppResult<u64>;
    async fn dead_page(&self, page: i32) -> AppResult<Vec<ArchivedTask>>;
}

#[async_trait]
impl<T: Task> DeadTasks for RedisStorage<T> {
    async fn dead_count(&self) -> AppResult<u64> {
        let stat = self
            .stats()
            .await
            .map_err(|e| AppError::Redis(format!("failed to read {} stats: {e}", T::KIND)))?;
        Ok(stat.dead as u64)
    }

    async fn dead_page(&self, page: i32) -> AppResult<Vec<ArchivedTask>> {
        let requests = self
            .list_jobs(&State::Killed, page)
            .await
            .map_err(|e| AppError::Redis(format!("failed to list dead {} tasks: {e}", T::KIND)))?;

        requests
            .into_iter()
            .map(|request| -> AppResult<ArchivedTask> {
                Ok(ArchivedTask {
                    id: request.parts.task_id.to_string(),
                    kind: T::KIND.type_name().to_string(),
                    queue: T::KIND.type_name().to_string(),
                    attempts: request.parts.attempt.current(),
                    payload: serde_json::to_value(&request.args)?,
                    last_error: None,
                    failed_at: None,
                })
            })
            .collect()
    }
}

/// [`QueueInspector`] over the pipeline's Redis storages.
#[derive(Clone)]
pub struct RedisQueueInspector {
    queues: HashMap<&'static str, Arc<dyn DeadTasks>>,
    failures: Arc<dyn FailureLog>,
}

impl RedisQueueInspector {
    /// Create an inspector for every task type.
    #[must_use]
    pub fn new(storages: &QueueStorages, failures: Arc<dyn FailureLog>) -> Self {
        let queues: HashMap<&'static str, Arc<dyn DeadTasks>> = HashMap::from([
            (
                TaskKind::ScrapeSite.type_name(),
                Arc::new(storages.scrape.clone()) as Arc<dyn DeadTasks>,
            ),
            (
                TaskKind::ProcessResults.type_name(),
                Arc::new(storages.results.clone()) as Arc<dyn DeadTasks>,
            ),
            (
                TaskKind::AnalyzeResume.type_name(),
                Arc::new(storages.analyze.clone()) as Arc<dyn DeadTasks>,
            ),
            (
                TaskKind::NotifyUser.type_name(),
                Arc::new(storages.notify.clone()) as Arc<dyn DeadTasks>,
            ),
        ]);
        Self { queues, failures }
    }

    fn queue(&self, name: &str) -> AppResult<&Arc<dyn DeadTasks>> {
        self.queues
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("queue {name}")))
    }
}

#[async_trait]
impl QueueInspector for RedisQueueInspector {
    async fn archived_count(&self, queue: &str) -> AppResult<u64> {
        self.queue(queue)?.dead_count().await
    }

    async fn archived_tasks(&self, queue: &str, page: i32) -> AppResult<Vec<ArchivedTask>> {
        let tasks = self.queue(queue)?.dead_page(page).await?;
        Ok(with_failures(self.failures.as_ref(), tasks).await)
    }
}

/// Attach the recorded failure of each task. A failed lookup leaves the tasks
/// without one.
async fn with_failures(log: &dyn FailureLog, mut tasks: Vec<ArchivedTask>) -> Vec<ArchivedTask> {
    if tasks.is_empty() {
        return tasks;
    }

    let ids: Vec<String> = tasks.iter().map(|task| task.id.clone()).collect();
    let mut failures = match log.last_failures(&ids).await {
        Ok(failures) => failures,
        Err(e) => {
            tracing::warn!(error = %e, count = ids.len(), "Failed to read task failures");
            return tasks;
        }
    };

    for task in &mut tasks {
        if let Some(failure) = failures.remove(&task.id) {
            task.last_error = Some(failure.error);
            task.failed_at = Some(failure.failed_at);
        }
    }
    tasks
}
