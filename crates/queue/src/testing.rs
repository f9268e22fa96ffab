//! In-memory collaborators shared by the unit tests of this crate.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use scrapjobs_common::{AppError, AppResult};
use scrapjobs_core::models::{
    ApiConfig, Curriculum, Job, JobCandidate, MatchAnalysis, Plan, ResumeAnalysis, ScrapingType,
    SelectorConfig, SiteScrapingConfig, UserSiteCurriculum,
};
use scrapjobs_core::services::{
    EmailSender, JobStore, NotificationStore, PlanStore, ResumeAnalyzer, SiteConfigStore,
    SubscriptionStore,
};

use crate::enqueuer::TaskQueue;
use crate::failures::{FailureLog, TaskFailure};
use crate::tasks::{
    AnalyzeUserJobPayload, NotifyUserPayload, ProcessResultsPayload, ScrapeSitePayload,
};

/// Records every enqueued payload.
#[derive(Default)]
pub struct RecordingQueue {
    pub scrapes: Mutex<Vec<ScrapeSitePayload>>,
    pub results: Mutex<Vec<ProcessResultsPayload>>,
    pub analyses: Mutex<Vec<AnalyzeUserJobPayload>>,
    pub notifications: Mutex<Vec<NotifyUserPayload>>,
    /// Site ids whose scrape enqueue fails.
    pub failing_sites: Mutex<Vec<i32>>,
    /// User ids whose analyze enqueue fails.
    pub failing_users: Mutex<Vec<i32>>,
    pub fail_all: AtomicBool,
}

impl RecordingQueue {
    fn check(&self) -> AppResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(AppError::Queue("redis unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue_scrape(&self, payload: ScrapeSitePayload) -> AppResult<()> {
        self.check()?;
        if self.failing_sites.lock().unwrap().contains(&payload.site_id) {
            return Err(AppError::Queue(format!("site {} rejected", payload.site_id)));
        }
        self.scrapes.lock().unwrap().push(payload);
        Ok(())
    }

    async fn enqueue_process_results(&self, payload: ProcessResultsPayload) -> AppResult<()> {
        self.check()?;
        self.results.lock().unwrap().push(payload);
        Ok(())
    }

    async fn enqueue_analyze(&self, payload: AnalyzeUserJobPayload) -> AppResult<()> {
        self.check()?;
        if self.failing_users.lock().unwrap().contains(&payload.user.user_id) {
            return Err(AppError::Queue(format!("user {} rejected", payload.user.user_id)));
        }
        self.analyses.lock().unwrap().push(payload);
        Ok(())
    }

    async fn enqueue_notify(&self, payload: NotifyUserPayload) -> AppResult<()> {
        self.check()?;
        self.notifications.lock().unwrap().push(payload);
        Ok(())
    }
}

pub fn site(id: i32) -> SiteScrapingConfig {
    SiteScrapingConfig {
        id,
        site_name: format!("Site {id}"),
        base_url: format!("https://site{id}.example"),
        is_active: true,
        scraping_type: ScrapingType::Selector,
        selectors: SelectorConfig::default(),
        api: ApiConfig::default(),
    }
}

pub fn job(id: i32, title: &str) -> Job {
    Job {
        id,
        site_id: 1,
        title: title.to_string(),
        location: "Remote".to_string(),
        company: "Acme".to_string(),
        link: format!("https://site1.example/jobs/{id}"),
        requisition_id: i64::from(id) * 100,
        description: Some("Build services".to_string()),
        last_seen_at: Utc::now(),
    }
}

pub fn user(user_id: i32, filters: &[&str]) -> UserSiteCurriculum {
    UserSiteCurriculum {
        user_id,
        name: format!("User {user_id}"),
        email: format!("user{user_id}@example.com"),
        curriculum: Some(Curriculum {
            id: user_id,
            user_id,
            title: "Backend developer".to_string(),
            is_active: true,
            ..Curriculum::default()
        }),
        target_words: filters.iter().map(ToString::to_string).collect(),
    }
}

/// Fixed subscriber list.
#[derive(Default)]
pub struct MemorySubscriptions(Vec<UserSiteCurriculum>);

impl MemorySubscriptions {
    pub const fn new(users: Vec<UserSiteCurriculum>) -> Self {
        Self(users)
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptions {
    async fn users_by_site(&self, _site_id: i32) -> AppResult<Vec<UserSiteCurriculum>> {
        Ok(self.0.clone())
    }
}

/// Notification rows and monthly counters.
#[derive(Default)]
pub struct MemoryNotifications {
    rows: Mutex<HashSet<(i32, i32)>>,
    monthly: Mutex<HashMap<i32, u64>>,
}

impl MemoryNotifications {
    pub fn mark_notified(&self, user_id: i32, job_id: i32) {
        self.rows.lock().unwrap().insert((user_id, job_id));
    }

    pub fn set_monthly_count(&self, user_id: i32, count: u64) {
        self.monthly.lock().unwrap().insert(user_id, count);
    }
}

#[async_trait]
impl NotificationStore for MemoryNotifications {
    async fn insert_notification(&self, job_id: i32, user_id: i32) -> AppResult<bool> {
        Ok(self.rows.lock().unwrap().insert((user_id, job_id)))
    }

    async fn notified_job_ids(&self, user_id: i32, job_ids: &[i32]) -> AppResult<HashSet<i32>> {
        let rows = self.rows.lock().unwrap();
        Ok(job_ids
            .iter()
            .copied()
            .filter(|job_id| rows.contains(&(user_id, *job_id)))
            .collect())
    }

    async fn monthly_analysis_count(&self, user_id: i32) -> AppResult<u64> {
        Ok(self.monthly.lock().unwrap().get(&user_id).copied().unwrap_or(0))
    }
}

/// Plans keyed by user.
#[derive(Default)]
pub struct MemoryPlans(HashMap<i32, Plan>);

impl MemoryPlans {
    pub fn with_quota(user_ids: &[i32], max_ai_analyses: i32) -> Self {
        Self(
            user_ids
                .iter()
                .map(|id| {
                    let plan = Plan {
                        id: 1,
                        name: "Pro".to_string(),
                        price: 9.9,
                        max_sites: 10,
                        max_ai_analyses,
                        features: vec![],
                    };
                    (*id, plan)
                })
                .collect(),
        )
    }

    pub fn unlimited(user_ids: &[i32]) -> Self {
        Self::with_quota(user_ids, 0)
    }
}

#[async_trait]
impl PlanStore for MemoryPlans {
    async fn plan_for_user(&self, user_id: i32) -> AppResult<Option<Plan>> {
        Ok(self.0.get(&user_id).cloned())
    }
}

/// Analyzer with a fixed behaviour.
pub enum ScriptedAnalyzer {
    Score(f64),
    Fail,
    Hang,
}

impl ScriptedAnalyzer {
    pub const fn scoring(score: f64) -> Self {
        Self::Score(score)
    }

    pub const fn failing() -> Self {
        Self::Fail
    }

    pub const fn hanging() -> Self {
        Self::Hang
    }
}

#[async_trait]
impl ResumeAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, _curriculum: &Curriculum, _job: &Job) -> AppResult<ResumeAnalysis> {
        match self {
            Self::Score(score) => Ok(ResumeAnalysis {
                match_analysis: MatchAnalysis {
                    overall_score_numeric: *score,
                    overall_score_qualitative: "Good".to_string(),
                    summary: "Solid fit".to_string(),
                },
                ..ResumeAnalysis::default()
            }),
            Self::Fail => Err(AppError::ExternalService("model unavailable".to_string())),
            Self::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(ResumeAnalysis::default())
            }
        }
    }
}

/// Records recipients of sent emails.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send_analysis_email(
        &self,
        address: &str,
        _job: &Job,
        _analysis: &ResumeAnalysis,
    ) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ExternalService("smtp down".to_string()));
        }
        self.sent.lock().unwrap().push(address.to_string());
        Ok(())
    }
}

/// Fixed list of active sites.
#[derive(Default)]
pub struct MemorySites(Vec<SiteScrapingConfig>);

impl MemorySites {
    pub const fn new(sites: Vec<SiteScrapingConfig>) -> Self {
        Self(sites)
    }
}

#[async_trait]
impl SiteConfigStore for MemorySites {
    async fn active_sites(&self) -> AppResult<Vec<SiteScrapingConfig>> {
        Ok(self.0.clone())
    }
}

/// Job store that only answers purges.
#[derive(Default)]
pub struct StaleJobs {
    pub stale: AtomicU64,
    pub retentions: Mutex<Vec<Duration>>,
}

#[async_trait]
impl JobStore for StaleJobs {
    async fn create_job(
        &self,
        _site_id: i32,
        _requisition_id: i64,
        _candidate: &JobCandidate,
    ) -> AppResult<Job> {
        Err(AppError::Internal("not used".to_string()))
    }

    async fn find_by_requisition_ids(
        &self,
        _site_id: i32,
        _requisition_ids: &[i64],
    ) -> AppResult<HashMap<i64, i32>> {
        Ok(HashMap::new())
    }

    async fn update_last_seen(&self, _job_id: i32) -> AppResult<()> {
        Ok(())
    }

    async fn delete_stale(&self, older_than: Duration) -> AppResult<u64> {
        self.retentions.lock().unwrap().push(older_than);
        Ok(self.stale.swap(0, Ordering::SeqCst))
    }
}

/// Failure log held in memory.
#[derive(Default)]
pub struct MemoryFailures {
    pub failures: Mutex<HashMap<String, TaskFailure>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemoryFailures {
    pub fn with(entries: impl IntoIterator<Item = (String, TaskFailure)>) -> Self {
        Self {
            failures: Mutex::new(entries.into_iter().collect()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl FailureLog for MemoryFailures {
    async fn record(&self, task_id: &str, failure: &TaskFailure) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Redis("connection refused".to_string()));
        }
        self.failures
            .lock()
            .unwrap()
            .insert(task_id.to_string(), failure.clone());
        Ok(())
    }

    async fn last_failures(&self, task_ids: &[String]) -> AppResult<HashMap<String, TaskFailure>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Redis("connection refused".to_string()));
        }
        let failures = self.failures.lock().unwrap();
        Ok(task_ids
            .iter()
            .filter_map(|id| failures.get(id).map(|f| (id.clone(), f.clone())))
            .collect())
    }
}
