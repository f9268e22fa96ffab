//! Analyze-resume task.

use scrapjobs_core::models::{Job, UserSiteCurriculum};
use serde::{Deserialize, Serialize};

/// One user and one job to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeUserJobPayload {
    pub user: UserSiteCurriculum,
    pub job: Job,
}
