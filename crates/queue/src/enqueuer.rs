//! Redis-backed task enqueueing.
//!
//! Every task type lives in its own apalis-redis namespace named after the
//! task type, so `scrape:site` tasks are stored under `scrape:site:*` keys.

use apalis::prelude::*;
use apalis_redis::RedisStorage;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use scrapjobs_common::{AppError, AppResult};

use crate::tasks::{
    AnalyzeUserJobPayload, NotifyUserPayload, ProcessResultsPayload, ScrapeSitePayload, Task,
};

/// Hands tasks to the next pipeline stage.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Queue a site scrape.
    async fn enqueue_scrape(&self, payload: ScrapeSitePayload) -> AppResult<()>;

    /// Queue the stored jobs of one scrape for matching.
    async fn enqueue_process_results(&self, payload: ProcessResultsPayload) -> AppResult<()>;

    /// Queue one user/job analysis.
    async fn enqueue_analyze(&self, payload: AnalyzeUserJobPayload) -> AppResult<()>;

    /// Queue one notification.
    async fn enqueue_notify(&self, payload: NotifyUserPayload) -> AppResult<()>;
}

/// Storage for one task type, namespaced by its queue name.
#[must_use]
pub fn storage_for<T: Task>(conn: ConnectionManager) -> RedisStorage<T> {
    let config = apalis_redis::Config::default().set_namespace(T::KIND.type_name());
    RedisStorage::new_with_config(conn, config)
}

/// One storage per task type.
#[derive(Clone)]
pub struct QueueStorages {
    pub scrape: RedisStorage<ScrapeSitePayload>,
    pub results: RedisStorage<ProcessResultsPayload>,
    pub analyze: RedisStorage<AnalyzeUserJobPayload>,
    pub notify: RedisStorage<NotifyUserPayload>,
}

impl QueueStorages {
    /// Create storages sharing one connection manager.
    #[must_use]
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            scrape: storage_for(conn.clone()),
            results: storage_for(conn.clone()),
            analyze: storage_for(conn.clone()),
            notify: storage_for(conn),
        }
    }

    /// Connect to Redis and create the storages.
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::Redis(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Redis(format!("failed to connect to redis: {e}")))?;
        Ok(Self::new(conn))
    }
}

/// [`TaskQueue`] backed by apalis-redis.
#[derive(Clone)]
pub struct RedisTaskQueue {
    storages: QueueStorages,
}

impl RedisTaskQueue {
    /// Create a new Redis task queue.
    #[must_use]
    pub const fn new(storages: QueueStorages) -> Self {
        Self { storages }
    }

    async fn push<T: Task>(storage: &RedisStorage<T>, payload: T) -> AppResult<()> {
        storage
            .clone()
            .push(payload)
            .await
            .map_err(|e| AppError::Queue(format!("failed to enqueue {}: {e}", T::KIND)))?;

        tracing::debug!(task = %T::KIND, "Queued task");
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn enqueue_scrape(&self, payload: ScrapeSitePayload) -> AppResult<()> {
        Self::push(&self.storages.scrape, payload).await
    }

    async fn enqueue_process_results(&self, payload: ProcessResultsPayload) -> AppResult<()> {
        Self::push(&self.storages.results, payload).await
    }

    async fn enqueue_analyze(&self, payload: AnalyzeUserJobPayload) -> AppResult<()> {
        Self::push(&self.storages.analyze, payload).await
    }

    async fn enqueue_notify(&self, payload: NotifyUserPayload) -> AppResult<()> {
        Self::push(&self.storages.notify, payload).await
    }
}
