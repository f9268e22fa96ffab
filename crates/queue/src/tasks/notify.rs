//! Notify-user task.

use scrapjobs_core::models::{Job, ResumeAnalysis, UserSiteCurriculum};
use serde::{Deserialize, Serialize};

/// An analysis ready to be sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyUserPayload {
    pub user: UserSiteCurriculum,
    pub job: Job,
    pub analysis: ResumeAnalysis,
}
