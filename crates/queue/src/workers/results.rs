//! Match stage.

use std::sync::Arc;

use apalis::prelude::*;
use scrapjobs_common::{AppError, AppResult, Metrics};
use scrapjobs_core::MatchFinder;
use tracing::{info, warn};

use crate::enqueuer::TaskQueue;
use crate::failures::FailureRecorder;
use crate::tasks::{AnalyzeUserJobPayload, ProcessResultsPayload, TaskKind};

/// Fans stored jobs out to subscribers as analysis tasks.
#[derive(Clone)]
pub struct ProcessResultsHandler {
    matcher: MatchFinder,
    queue: Arc<dyn TaskQueue>,
    metrics: Arc<Metrics>,
}

impl ProcessResultsHandler {
    /// Create a new match handler.
    #[must_use]
    pub fn new(matcher: MatchFinder, queue: Arc<dyn TaskQueue>, metrics: Arc<Metrics>) -> Self {
        Self {
            matcher,
            queue,
            metrics,
        }
    }

    /// Run the stage.
    ///
    /// Every pair is attempted even after an enqueue failure; the task fails
    /// afterwards so the queue re-runs it.
    pub async fn handle(&self, payload: ProcessResultsPayload) -> AppResult<()> {
        let site_id = payload.site_id;
        let matches = self.matcher.find_matches(site_id, &payload.jobs).await?;
        let total = matches.len();

        let mut failed = 0usize;
        for m in matches {
            let user_id = m.user.user_id;
            let job_id = m.job.id;
            match self
                .queue
                .enqueue_analyze(AnalyzeUserJobPayload {
                    user: m.user,
                    job: m.job,
                })
                .await
            {
                Ok(()) => Metrics::add(&self.metrics.analyses_enqueued, 1),
                Err(e) => {
                    warn!(site_id, user_id, job_id, error = %e, "Failed to queue analysis");
                    failed += 1;
                }
            }
        }

        info!(site_id, jobs = payload.jobs.len(), matches = total, failed, "Processed scrape results");

        if failed > 0 {
            return Err(AppError::Queue(format!(
                "{failed} of {total} analysis tasks for site {site_id} could not be queued"
            )));
        }
        Ok(())
    }
}

/// Worker function for `process:results` tasks.
///
/// # Errors
/// Returns an error when subscribers cannot be read or an analysis cannot be queued.
pub async fn process_results_worker(
    payload: ProcessResultsPayload,
    handler: Data<ProcessResultsHandler>,
    failures: Data<FailureRecorder>,
    task_id: TaskId,
) -> Result<(), Error> {
    let site_id = payload.site_id;
    match handler.handle(payload).await {
        Ok(()) => Ok(()),
        Err(e) => Err(failures.fail(TaskKind::ProcessResults, &task_id, site_id, e).await),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{MemoryNotifications, MemoryPlans, MemorySubscriptions, RecordingQueue, job, user};
    use std::sync::atomic::Ordering;

    fn handler(
        subs: MemorySubscriptions,
        notifications: Arc<MemoryNotifications>,
        plans: MemoryPlans,
    ) -> (ProcessResultsHandler, Arc<RecordingQueue>, Arc<Metrics>) {
        let queue = Arc::new(RecordingQueue::default());
        let metrics = Arc::new(Metrics::new());
        let matcher = MatchFinder::new(Arc::new(subs), notifications, Arc::new(plans));
        (
            ProcessResultsHandler::new(matcher, queue.clone(), metrics.clone()),
            queue,
            metrics,
        )
    }

    fn payload() -> ProcessResultsPayload {
        ProcessResultsPayload {
            site_id: 1,
            jobs: vec![
                job(1, "Senior Go Developer"),
                job(2, "Rust Engineer"),
                job(3, "Go Developer II"),
            ],
        }
    }

    #[tokio::test]
    async fn test_enqueues_one_analysis_per_match() {
        let subs = MemorySubscriptions::new(vec![user(10, &["developer"]), user(11, &[])]);
        let (handler, queue, metrics) =
            handler(subs, Arc::default(), MemoryPlans::unlimited(&[10, 11]));

        handler.handle(payload()).await.unwrap();

        let analyses = queue.analyses.lock().unwrap();
        let pairs: Vec<_> = analyses.iter().map(|a| (a.user.user_id, a.job.id)).collect();
        assert_eq!(pairs, vec![(10, 1), (10, 3), (11, 1), (11, 2), (11, 3)]);
        assert_eq!(metrics.analyses_enqueued.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_exhausted_quota_yields_nothing() {
        let notifications = Arc::new(MemoryNotifications::default());
        notifications.set_monthly_count(10, 3);
        let subs = MemorySubscriptions::new(vec![user(10, &[])]);
        let (handler, queue, _) = handler(subs, notifications, MemoryPlans::with_quota(&[10], 3));

        handler.handle(payload()).await.unwrap();

        assert!(queue.analyses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_enqueue_failure_fails_after_trying_all() {
        let subs = MemorySubscriptions::new(vec![user(10, &[]), user(11, &[])]);
        let (handler, queue, _) = handler(subs, Arc::default(), MemoryPlans::unlimited(&[10, 11]));
        queue.failing_users.lock().unwrap().push(10);

        let err = handler.handle(payload()).await.unwrap_err();

        assert!(matches!(err, AppError::Queue(_)));
        assert_eq!(queue.analyses.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_notified_pairs_are_not_requeued() {
        let notifications = Arc::new(MemoryNotifications::default());
        notifications.mark_notified(10, 1);
        let subs = MemorySubscriptions::new(vec![user(10, &[])]);
        let (handler, queue, _) = handler(subs, notifications, MemoryPlans::unlimited(&[10]));

        handler.handle(payload()).await.unwrap();

        let ids: Vec<_> = queue.analyses.lock().unwrap().iter().map(|a| a.job.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
