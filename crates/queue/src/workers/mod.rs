//! Stage handlers and their apalis workers.
//!
//! Each task type is consumed by one apalis worker whose concurrency follows
//! the priority tier of the task type.

mod analyze;
mod notify;
mod results;
mod scrape;

use std::sync::Arc;

use apalis::layers::retry::RetryPolicy;
use apalis::prelude::*;
use scrapjobs_common::AppError;
use scrapjobs_common::config::WorkerSettings;

pub use analyze::{AnalyzeHandler, analyze_worker};
pub use notify::{NotifyHandler, notify_worker};
pub use results::{ProcessResultsHandler, process_results_worker};
pub use scrape::{ScrapeHandler, scrape_worker};

use crate::enqueuer::QueueStorages;
use crate::failures::FailureRecorder;
use crate::tasks::TaskKind;

/// Handlers for every task type.
#[derive(Clone)]
pub struct Handlers {
    /// `scrape:site`
    pub scrape: ScrapeHandler,
    /// `process:results`
    pub results: ProcessResultsHandler,
    /// `analyze:resume`
    pub analyze: AnalyzeHandler,
    /// `notify:user`
    pub notify: NotifyHandler,
    /// Shared by every worker.
    pub failures: FailureRecorder,
}

/// Log a failed task and wrap the error for apalis.
pub(crate) fn into_worker_error(task: &'static str, subject: i32, err: AppError) -> Error {
    tracing::error!(
        task,
        subject,
        code = err.error_code(),
        error = %err,
        "Task failed"
    );
    Error::Failed(Arc::new(Box::new(err)))
}

/// Worker concurrency of a task type.
#[must_use]
pub fn concurrency_for(kind: TaskKind, settings: &WorkerSettings) -> usize {
    settings.concurrency_for_weight(kind.tier().weight(&settings.queues))
}

/// Register one worker per task type.
#[must_use]
pub fn build_monitor(
    storages: &QueueStorages,
    handlers: Handlers,
    settings: &WorkerSettings,
) -> Monitor {
    let retries = settings.max_retries;

    Monitor::new()
        .register(
            WorkerBuilder::new(TaskKind::ScrapeSite.type_name())
                .enable_tracing()
                .concurrency(concurrency_for(TaskKind::ScrapeSite, settings))
                .retry(RetryPolicy::retries(retries))
                .data(handlers.scrape)
                .data(handlers.failures.clone())
                .backend(storages.scrape.clone())
                .build_fn(scrape_worker),
        )
        .register(
            WorkerBuilder::new(TaskKind::ProcessResults.type_name())
                .enable_tracing()
                .concurrency(concurrency_for(TaskKind::ProcessResults, settings))
                .retry(RetryPolicy::retries(retries))
                .data(handlers.results)
                .data(handlers.failures.clone())
                .backend(storages.results.clone())
                .build_fn(process_results_worker),
        )
        .register(
            WorkerBuilder::new(TaskKind::AnalyzeResume.type_name())
                .enable_tracing()
                .concurrency(concurrency_for(TaskKind::AnalyzeResume, settings))
                .retry(RetryPolicy::retries(retries))
                .data(handlers.analyze)
                .data(handlers.failures.clone())
                .backend(storages.analyze.clone())
                .build_fn(analyze_worker),
        )
        .register(
            WorkerBuilder::new(TaskKind::NotifyUser.type_name())
                .enable_tracing()
                .concurrency(concurrency_for(TaskKind::NotifyUser, settings))
                .retry(RetryPolicy::retries(retries))
                .data(handlers.notify)
                .data(handlers.failures.clone())
                .backend(storages.notify.clone())
                .build_fn(notify_worker),
        )
}
