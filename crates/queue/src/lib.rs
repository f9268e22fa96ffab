//! Task queue and background processes for scrapjobs.
//!
//! Work moves through four task types, each in its own apalis-redis queue:
//!
//! - **`scrape:site`**: scrape one site and store its jobs
//! - **`process:results`**: match stored jobs against subscribers
//! - **`analyze:resume`**: run the AI analysis of one user/job pair
//! - **`notify:user`**: record the notification and email the analysis
//!
//! The [`Scheduler`] feeds the first queue; the [`ArchiveMonitor`] watches
//! tasks that exhausted their retries, reporting the last failure each
//! worker recorded for them.

pub mod alert_set;
pub mod enqueuer;
pub mod failures;
pub mod inspector;
pub mod monitor;
pub mod scheduler;
pub mod tasks;
pub mod workers;

#[cfg(test)]
mod testing;

pub use alert_set::RedisAlertSet;
pub use enqueuer::{QueueStorages, RedisTaskQueue, TaskQueue, storage_for};
pub use failures::{FailureLog, FailureRecorder, RedisFailureLog, TaskFailure};
pub use inspector::RedisQueueInspector;
pub use monitor::{
    ARCHIVED_DEPTH_METRIC, AlertDedupStore, AlertSender, ArchiveMonitor, ArchivedTask,
    EmailAlertSender, MetricsSink, QueueInspector,
};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use tasks::{
    AnalyzeUserJobPayload, NotifyUserPayload, ProcessResultsPayload, ScrapeSitePayload, Task,
    TaskKind, Tier,
};
pub use workers::{
    AnalyzeHandler, Handlers, NotifyHandler, ProcessResultsHandler, ScrapeHandler, build_monitor,
};
