//! Process-results task.

use scrapjobs_core::models::Job;
use serde::{Deserialize, Serialize};

/// Stored jobs from one scrape, new and re-seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResultsPayload {
    pub site_id: i32,
    pub jobs: Vec<Job>,
}
