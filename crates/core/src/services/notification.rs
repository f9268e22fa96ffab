//! Notification service.

use std::sync::Arc;

use scrapjobs_common::AppResult;

use super::email::EmailSender;
use super::matching::NotificationStore;
use crate::models::{Job, ResumeAnalysis, UserSiteCurriculum};

/// Result of a notify attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The notification was recorded and the email sent.
    Sent,
    /// The pair was recorded earlier; nothing was sent.
    AlreadyNotified,
}

/// Records notifications and emails users.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    email: Arc<dyn EmailSender>,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub fn new(store: Arc<dyn NotificationStore>, email: Arc<dyn EmailSender>) -> Self {
        Self { store, email }
    }

    /// Notify a user about an analyzed job.
    ///
    /// The notification row is written before the email goes out and the
    /// email is only sent when the row is new, so a retried task never mails
    /// the same pair twice.
    pub async fn notify(
        &self,
        user: &UserSiteCurriculum,
        job: &Job,
        analysis: &ResumeAnalysis,
    ) -> AppResult<NotifyOutcome> {
        let inserted = self.store.insert_notification(job.id, user.user_id).await?;
        if !inserted {
            tracing::info!(
                user_id = user.user_id,
                job_id = job.id,
                "User already notified about job"
            );
            return Ok(NotifyOutcome::AlreadyNotified);
        }

        self.email
            .send_analysis_email(&user.email, job, analysis)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    user_id = user.user_id,
                    job_id = job.id,
                    error = %e,
                    "Failed to send analysis email after recording notification"
                );
            })?;

        Ok(NotifyOutcome::Sent)
    }
}
