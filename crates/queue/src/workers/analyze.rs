//! Analysis stage.

use std::sync::Arc;
use std::time::Duration;

use apalis::prelude::*;
use scrapjobs_common::{AppError, AppResult, Metrics};
use scrapjobs_core::ResumeAnalyzer;
use tracing::info;

use crate::enqueuer::TaskQueue;
use crate::failures::FailureRecorder;
use crate::tasks::{AnalyzeUserJobPayload, NotifyUserPayload, TaskKind};

/// Runs the AI analysis of one user/job pair.
#[derive(Clone)]
pub struct AnalyzeHandler {
    analyzer: Arc<dyn ResumeAnalyzer>,
    queue: Arc<dyn TaskQueue>,
    metrics: Arc<Metrics>,
    timeout: Duration,
}

impl AnalyzeHandler {
    /// Create a new analyze handler.
    ///
    /// `analyzer` is shared by every analysis of the process, so a
    /// rate-limited analyzer throttles them all together.
    #[must_use]
    pub fn new(
        analyzer: Arc<dyn ResumeAnalyzer>,
        queue: Arc<dyn TaskQueue>,
        metrics: Arc<Metrics>,
        timeout: Duration,
    ) -> Self {
        Self {
            analyzer,
            queue,
            metrics,
            timeout,
        }
    }

    /// Run the stage.
    pub async fn handle(&self, payload: AnalyzeUserJobPayload) -> AppResult<()> {
        let AnalyzeUserJobPayload { user, job } = payload;
        let curriculum = user.curriculum.as_ref().ok_or_else(|| {
            AppError::Config(format!("analysis task for user {} has no curriculum", user.user_id))
        })?;

        let result = tokio::time::timeout(self.timeout, self.analyzer.analyze(curriculum, &job))
            .await
            .unwrap_or_else(|_| {
                Err(AppError::ExternalService(format!(
                    "analysis timed out after {}s",
                    self.timeout.as_secs()
                )))
            });
        self.metrics.record_analysis(result.is_ok());
        let analysis = result?;

        info!(
            user_id = user.user_id,
            job_id = job.id,
            score = analysis.match_analysis.overall_score_numeric,
            "Analysis completed"
        );

        self.queue
            .enqueue_notify(NotifyUserPayload {
                user,
                job,
                analysis,
            })
            .await
    }
}

/// Worker function for `analyze:resume` tasks.
///
/// # Errors
/// Returns an error when the analysis fails or cannot be handed on.
pub async fn analyze_worker(
    payload: AnalyzeUserJobPayload,
    handler: Data<AnalyzeHandler>,
    failures: Data<FailureRecorder>,
    task_id: TaskId,
) -> Result<(), Error> {
    let user_id = payload.user.user_id;
    match handler.handle(payload).await {
        Ok(()) => Ok(()),
        Err(e) => Err(failures.fail(TaskKind::AnalyzeResume, &task_id, user_id, e).await),
    }
}
