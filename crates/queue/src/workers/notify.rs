//! Notification stage.

use std::sync::Arc;
use std::time::Duration;

use apalis::prelude::*;
use scrapjobs_common::{AppError, AppResult, Metrics};
use scrapjobs_core::{NotificationService, NotifyOutcome};

use crate::failures::FailureRecorder;
use crate::tasks::{NotifyUserPayload, TaskKind};

/// Records the notification and emails the analysis.
#[derive(Clone)]
pub struct NotifyHandler {
    notifications: NotificationService,
    metrics: Arc<Metrics>,
    timeout: Duration,
}

impl NotifyHandler {
    /// Create a new notify handler.
    #[must_use]
    pub const fn new(notifications: NotificationService, metrics: Arc<Metrics>, timeout: Duration) -> Self {
        Self {
            notifications,
            metrics,
            timeout,
        }
    }

    /// Run the stage.
    pub async fn handle(&self, payload: NotifyUserPayload) -> AppResult<NotifyOutcome> {
        let notify = self
            .notifications
            .notify(&payload.user, &payload.job, &payload.analysis);
        let outcome = tokio::time::timeout(self.timeout, notify)
            .await
            .map_err(|_| {
                AppError::ExternalService(format!(
                    "notification timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        if outcome == NotifyOutcome::Sent {
            Metrics::add(&self.metrics.notifications_sent, 1);
            tracing::info!(
                user_id = payload.user.user_id,
                job_id = payload.job.id,
                "Notification sent"
            );
        }
        Ok(outcome)
    }
}

/// Worker function for `notify:user` tasks.
///
/// # Errors
/// Returns an error when the notification cannot be recorded or the email fails.
pub async fn notify_worker(
    payload: NotifyUserPayload,
    handler: Data<NotifyHandler>,
    failures: Data<FailureRecorder>,
    task_id: TaskId,
) -> Result<(), Error> {
    let user_id = payload.user.user_id;
    match handler.handle(payload).await {
        Ok(_) => Ok(()),
        Err(e) => Err(failures.fail(TaskKind::NotifyUser, &task_id, user_id, e).await),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{MemoryNotifications, RecordingMailer, job, user};
    use scrapjobs_core::models::ResumeAnalysis;
    use std::sync::atomic::Ordering;

    fn payload() -> NotifyUserPayload {
        NotifyUserPayload {
            user: user(10, &[]),
            job: job(1, "Rust Engineer"),
            analysis: ResumeAnalysis::default(),
        }
    }

    fn handler(mailer: Arc<RecordingMailer>) -> (NotifyHandler, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        let service = NotificationService::new(Arc::new(MemoryNotifications::default()), mailer);
        (
            NotifyHandler::new(service, metrics.clone(), Duration::from_secs(1)),
            metrics,
        )
    }

    #[tokio::test]
    async fn test_second_run_sends_no_email() {
        let mailer = Arc::new(RecordingMailer::default());
        let (handler, metrics) = handler(mailer.clone());

        assert_eq!(handler.handle(payload()).await.unwrap(), NotifyOutcome::Sent);
        assert_eq!(handler.handle(payload()).await.unwrap(), NotifyOutcome::AlreadyNotified);

        assert_eq!(mailer.sent.lock().unwrap().as_slice(), ["user10@example.com"]);
        assert_eq!(metrics.notifications_sent.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_email_failure_fails_task_without_resend() {
        let mailer = Arc::new(RecordingMailer::default());
        mailer.fail.store(true, Ordering::SeqCst);
        let (handler, _) = handler(mailer.clone());

        assert!(handler.handle(payload()).await.is_err());

        mailer.fail.store(false, Ordering::SeqCst);
        assert_eq!(handler.handle(payload()).await.unwrap(), NotifyOutcome::AlreadyNotified);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }
}
