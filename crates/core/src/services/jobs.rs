//! Job ingestion.
//!
//! Turns scraped candidates into stored jobs, deduplicating by requisition id
//! within a site so that repeated crawls refresh rows instead of adding them.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use scrapjobs_common::{AppError, AppResult};
use scrapjobs_db::repositories::{JobRepository, NewJob};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{Job, JobCandidate};

/// Storage of scraped jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store a new job and return it with its surrogate id.
    async fn create_job(
        &self,
        site_id: i32,
        requisition_id: i64,
        candidate: &JobCandidate,
    ) -> AppResult<Job>;

    /// Map each already stored requisition id of the site to its job id.
    async fn find_by_requisition_ids(
        &self,
        site_id: i32,
        requisition_ids: &[i64],
    ) -> AppResult<HashMap<i64, i32>>;

    /// Mark a job as seen now.
    async fn update_last_seen(&self, job_id: i32) -> AppResult<()>;

    /// Delete jobs not seen for longer than `older_than`.
    async fn delete_stale(&self, older_than: Duration) -> AppResult<u64>;
}

#[async_trait]
impl JobStore for JobRepository {
    async fn create_job(
        &self,
        site_id: i32,
        requisition_id: i64,
        candidate: &JobCandidate,
    ) -> AppResult<Job> {
        let model = self
            .create(NewJob {
                site_id,
                title: candidate.title.clone(),
                location: candidate.location.clone(),
                company: candidate.company.clone(),
                job_link: candidate.link.clone(),
                requisition_id,
                description: candidate.description.clone(),
            })
            .await?;
        Ok(model.into())
    }

    async fn find_by_requisition_ids(
        &self,
        site_id: i32,
        requisition_ids: &[i64],
    ) -> AppResult<HashMap<i64, i32>> {
        Ok(JobRepository::find_by_requisition_ids(self, site_id, requisition_ids)
            .await?
            .into_iter()
            .map(|job| (job.requisition_id, job.id))
            .collect())
    }

    async fn update_last_seen(&self, job_id: i32) -> AppResult<()> {
        self.touch_last_seen(job_id).await
    }

    async fn delete_stale(&self, older_than: Duration) -> AppResult<u64> {
        let age = chrono::Duration::from_std(older_than)
            .map_err(|e| AppError::Config(format!("retention window out of range: {e}")))?;
        self.delete_seen_before(Utc::now() - age).await
    }
}

/// Result of ingesting one scrape.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Every stored job from the scrape, new and re-seen, in scrape order.
    pub jobs: Vec<Job>,
    /// Jobs stored for the first time.
    pub inserted: usize,
    /// Jobs that already existed and had `last_seen_at` refreshed.
    pub refreshed: usize,
    /// Candidates dropped for lacking a requisition id or failing to store.
    pub skipped: usize,
}

/// Deduplicates scraped candidates against storage.
#[derive(Clone)]
pub struct JobIngestService {
    store: Arc<dyn JobStore>,
}

impl JobIngestService {
    /// Create a new ingest service.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Store the candidates of one site scrape.
    ///
    /// The existing-id lookup happens in one batch; failing it fails the whole
    /// ingest. Failures on individual candidates only skip that candidate.
    pub async fn ingest(
        &self,
        site_id: i32,
        candidates: Vec<JobCandidate>,
    ) -> AppResult<IngestOutcome> {
        let mut outcome = IngestOutcome::default();

        let mut seen = HashSet::new();
        let mut keyed = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let Some(requisition_id) = candidate.requisition_id else {
                debug!(site_id, link = %candidate.link, "Skipping candidate without requisition id");
                outcome.skipped += 1;
                continue;
            };
            if seen.insert(requisition_id) {
                keyed.push((requisition_id, candidate));
            }
        }

        if keyed.is_empty() {
            return Ok(outcome);
        }

        let ids: Vec<i64> = keyed.iter().map(|(id, _)| *id).collect();
        let existing = self.store.find_by_requisition_ids(site_id, &ids).await?;
        let now = Utc::now();

        for (requisition_id, candidate) in keyed {
            if let Some(&job_id) = existing.get(&requisition_id) {
                if let Err(e) = self.store.update_last_seen(job_id).await {
                    warn!(site_id, job_id, error = %e, "Failed to refresh last_seen_at");
                    outcome.skipped += 1;
                    continue;
                }
                outcome.refreshed += 1;
                outcome
                    .jobs
                    .push(Job::from_candidate(job_id, site_id, requisition_id, candidate, now));
            } else {
                match self.store.create_job(site_id, requisition_id, &candidate).await {
                    Ok(job) => {
                        outcome.inserted += 1;
                        outcome.jobs.push(job);
                    }
                    Err(e) => {
                        warn!(site_id, requisition_id, error = %e, "Failed to store job");
                        outcome.skipped += 1;
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Delete jobs not re-sighted within `retention`.
    pub async fn purge_stale(&self, retention: Duration) -> AppResult<u64> {
        self.store.delete_stale(retention).await
    }
}
