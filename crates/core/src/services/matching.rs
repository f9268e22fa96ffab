//! Match finding and quota enforcement.
//!
//! For every subscriber of a site the finder keeps the jobs whose title hits
//! one of the subscriber's keywords, drops pairs that were already notified,
//! and caps the result at the analyses left in the subscriber's plan.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use scrapjobs_common::AppResult;
use scrapjobs_db::repositories::{JobNotificationRepository, PlanRepository, SubscriptionRepository};
use tracing::{debug, info, warn};

use crate::models::{Job, Plan, UserSiteCurriculum};

/// Subscribers of a site.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Users subscribed to the site, with curriculum and keyword filters inlined.
    async fn users_by_site(&self, site_id: i32) -> AppResult<Vec<UserSiteCurriculum>>;
}

/// Notification history.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Record a notification; `false` when the pair was already recorded.
    async fn insert_notification(&self, job_id: i32, user_id: i32) -> AppResult<bool>;

    /// The subset of `job_ids` the user was already notified about.
    async fn notified_job_ids(&self, user_id: i32, job_ids: &[i32]) -> AppResult<HashSet<i32>>;

    /// Analyses consumed by the user in the current calendar month.
    async fn monthly_analysis_count(&self, user_id: i32) -> AppResult<u64>;
}

/// Plan lookup.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// The plan of the user, if any.
    async fn plan_for_user(&self, user_id: i32) -> AppResult<Option<Plan>>;
}

#[async_trait]
impl SubscriptionStore for SubscriptionRepository {
    async fn users_by_site(&self, site_id: i32) -> AppResult<Vec<UserSiteCurriculum>> {
        Ok(self
            .find_subscribers(site_id)
            .await?
            .into_iter()
            .map(UserSiteCurriculum::from)
            .collect())
    }
}

#[async_trait]
impl NotificationStore for JobNotificationRepository {
    async fn insert_notification(&self, job_id: i32, user_id: i32) -> AppResult<bool> {
        self.insert_if_absent(user_id, job_id).await
    }

    async fn notified_job_ids(&self, user_id: i32, job_ids: &[i32]) -> AppResult<HashSet<i32>> {
        Ok(self
            .find_notified_job_ids(user_id, job_ids)
            .await?
            .into_iter()
            .collect())
    }

    async fn monthly_analysis_count(&self, user_id: i32) -> AppResult<u64> {
        self.count_since(user_id, start_of_month(Utc::now())).await
    }
}

#[async_trait]
impl PlanStore for PlanRepository {
    async fn plan_for_user(&self, user_id: i32) -> AppResult<Option<Plan>> {
        Ok(self.find_by_user_id(user_id).await?.map(Plan::from))
    }
}

/// Midnight UTC on the first day of the month containing `now`.
#[must_use]
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(now, |dt| dt.and_utc())
}

/// Whether a job title hits any of the keywords, ignoring case.
///
/// An empty keyword list matches every title.
#[must_use]
pub fn matches_filters(title: &str, filters: &[String]) -> bool {
    if filters.is_empty() {
        return true;
    }
    let title = title.to_lowercase();
    filters
        .iter()
        .any(|keyword| title.contains(&keyword.to_lowercase()))
}

/// A job selected for analysis against a user's curriculum.
#[derive(Debug, Clone)]
pub struct UserJobMatch {
    pub user: UserSiteCurriculum,
    pub job: Job,
}

/// Finds which subscribers should get which jobs analyzed.
#[derive(Clone)]
pub struct MatchFinder {
    subscriptions: Arc<dyn SubscriptionStore>,
    notifications: Arc<dyn NotificationStore>,
    plans: Arc<dyn PlanStore>,
}

impl MatchFinder {
    /// Create a new match finder.
    #[must_use]
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        notifications: Arc<dyn NotificationStore>,
        plans: Arc<dyn PlanStore>,
    ) -> Self {
        Self {
            subscriptions,
            notifications,
            plans,
        }
    }

    /// Pair the site's jobs with the subscribers that should see them.
    ///
    /// Only the subscriber lookup can fail the call; problems with a single
    /// user skip that user.
    pub async fn find_matches(&self, site_id: i32, jobs: &[Job]) -> AppResult<Vec<UserJobMatch>> {
        if jobs.is_empty() {
            return Ok(vec![]);
        }

        let users = self.subscriptions.users_by_site(site_id).await?;
        let mut matches = Vec::new();

        for user in users {
            let user_id = user.user_id;
            match self.matches_for_user(&user, jobs).await {
                Ok(selected) => {
                    if !selected.is_empty() {
                        info!(site_id, user_id, count = selected.len(), "Matched jobs for user");
                    }
                    matches.extend(selected.into_iter().map(|job| UserJobMatch {
                        user: user.clone(),
                        job: job.clone(),
                    }));
                }
                Err(e) => {
                    warn!(site_id, user_id, error = %e, "Skipping user after lookup failure");
                }
            }
        }

        Ok(matches)
    }

    async fn matches_for_user<'a>(
        &self,
        user: &UserSiteCurriculum,
        jobs: &'a [Job],
    ) -> AppResult<Vec<&'a Job>> {
        let user_id = user.user_id;

        if user.active_curriculum().is_none() {
            debug!(user_id, "User has no active curriculum");
            return Ok(vec![]);
        }

        let Some(plan) = self.plans.plan_for_user(user_id).await? else {
            debug!(user_id, "User has no plan");
            return Ok(vec![]);
        };

        let remaining = match plan.analysis_quota() {
            Some(quota) => {
                let used = self.notifications.monthly_analysis_count(user_id).await?;
                let remaining = quota.saturating_sub(used);
                if remaining == 0 {
                    debug!(user_id, quota, used, "Monthly analysis quota exhausted");
                    return Ok(vec![]);
                }
                Some(remaining)
            }
            None => None,
        };

        let filtered: Vec<&Job> = jobs
            .iter()
            .filter(|job| matches_filters(&job.title, &user.target_words))
            .collect();
        if filtered.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<i32> = filtered.iter().map(|job| job.id).collect();
        let notified = self.notifications.notified_job_ids(user_id, &ids).await?;

        let mut selected: Vec<&Job> = filtered
            .into_iter()
            .filter(|job| !notified.contains(&job.id))
            .collect();

        if let Some(remaining) = remaining {
            selected.truncate(usize::try_from(remaining).unwrap_or(usize::MAX));
        }

        Ok(selected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::Curriculum;
    use chrono::TimeZone;
    use scrapjobs_common::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Fixture {
        users: Vec<UserSiteCurriculum>,
        plans: HashMap<i32, Plan>,
        used: HashMap<i32, u64>,
        notified: Mutex<HashSet<(i32, i32)>>,
        failing_plan_users: HashSet<i32>,
    }

    #[async_trait]
    impl SubscriptionStore for Fixture {
        async fn users_by_site(&self, _site_id: i32) -> AppResult<Vec<UserSiteCurriculum>> {
            Ok(self.users.clone())
        }
    }

    #[async_trait]
    impl NotificationStore for Fixture {
        async fn insert_notification(&self, job_id: i32, user_id: i32) -> AppResult<bool> {
            Ok(self.notified.lock().unwrap().insert((user_id, job_id)))
        }

        async fn notified_job_ids(&self, user_id: i32, job_ids: &[i32]) -> AppResult<HashSet<i32>> {
            let notified = self.notified.lock().unwrap();
            Ok(job_ids
                .iter()
                .copied()
                .filter(|id| notified.contains(&(user_id, *id)))
                .collect())
        }

        async fn monthly_analysis_count(&self, user_id: i32) -> AppResult<u64> {
            Ok(self.used.get(&user_id).copied().unwrap_or(0))
        }
    }

    #[async_trait]
    impl PlanStore for Fixture {
        async fn plan_for_user(&self, user_id: i32) -> AppResult<Option<Plan>> {
            if self.failing_plan_users.contains(&user_id) {
                return Err(AppError::Database("timeout".into()));
            }
            Ok(self.plans.get(&user_id).cloned())
        }
    }

    fn finder(fixture: Fixture) -> (MatchFinder, Arc<Fixture>) {
        let fixture = Arc::new(fixture);
        (
            MatchFinder::new(fixture.clone(), fixture.clone(), fixture.clone()),
            fixture,
        )
    }

    fn user(user_id: i32, words: &[&str]) -> UserSiteCurriculum {
        UserSiteCurriculum {
            user_id,
            name: format!("user{user_id}"),
            email: format!("user{user_id}@example.com"),
            curriculum: Some(Curriculum {
                id: user_id,
                user_id,
                is_active: true,
                ..Curriculum::default()
            }),
            target_words: words.iter().map(|w| (*w).to_string()).collect(),
        }
    }

    fn plan(max_ai_analyses: i32) -> Plan {
        Plan {
            id: 1,
            name: "Plan".to_string(),
            price: 0.0,
            max_sites: 3,
            max_ai_analyses,
            features: vec![],
        }
    }

    fn job(id: i32, title: &str) -> Job {
        Job {
            id,
            site_id: 1,
            title: title.to_string(),
            location: String::new(),
            company: String::new(),
            link: format!("https://jobs.example/{id}"),
            requisition_id: i64::from(id) * 100,
            description: None,
            last_seen_at: Utc::now(),
        }
    }

    fn job_ids(matches: &[UserJobMatch]) -> Vec<i32> {
        matches.iter().map(|m| m.job.id).collect()
    }

    #[test]
    fn test_keyword_filter_is_case_insensitive() {
        assert!(matches_filters("Senior Go Developer", &["developer".to_string()]));
        assert!(matches_filters("senior go developer", &["DEVELOPER".to_string()]));
        assert!(!matches_filters("Product Manager", &["developer".to_string()]));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(matches_filters("Anything at all", &[]));
    }

    #[test]
    fn test_start_of_month() {
        let now = Utc.with_ymd_and_hms(2025, 3, 17, 15, 4, 5).unwrap();
        assert_eq!(
            start_of_month(now),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_exhausted_quota_yields_nothing() {
        let (finder, _) = finder(Fixture {
            users: vec![user(1, &[])],
            plans: HashMap::from([(1, plan(5))]),
            used: HashMap::from([(1, 5)]),
            ..Fixture::default()
        });

        let jobs: Vec<Job> = (1..=10).map(|i| job(i, "Engineer")).collect();
        let matches = finder.find_matches(1, &jobs).await.unwrap();

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_remaining_quota_truncates_in_order() {
        let (finder, _) = finder(Fixture {
            users: vec![user(1, &[])],
            plans: HashMap::from([(1, plan(5))]),
            used: HashMap::from([(1, 3)]),
            ..Fixture::default()
        });

        let jobs: Vec<Job> = (1..=6).map(|i| job(i, "Engineer")).collect();
        let matches = finder.find_matches(1, &jobs).await.unwrap();

        assert_eq!(job_ids(&matches), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unlimited_plan_is_not_truncated() {
        let (finder, _) = finder(Fixture {
            users: vec![user(1, &[])],
            plans: HashMap::from([(1, plan(0))]),
            used: HashMap::from([(1, 1000)]),
            ..Fixture::default()
        });

        let jobs: Vec<Job> = (1..=20).map(|i| job(i, "Engineer")).collect();
        assert_eq!(finder.find_matches(1, &jobs).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_notified_pairs_are_excluded_across_runs() {
        let (finder, fixture) = finder(Fixture {
            users: vec![user(1, &["developer"])],
            plans: HashMap::from([(1, plan(-1))]),
            ..Fixture::default()
        });

        let jobs = vec![
            job(1, "Senior Go Developer"),
            job(2, "Designer"),
            job(3, "Rust Developer"),
        ];

        let first = finder.find_matches(1, &jobs).await.unwrap();
        assert_eq!(job_ids(&first), vec![1, 3]);

        for m in &first {
            fixture.insert_notification(m.job.id, m.user.user_id).await.unwrap();
        }

        let second = finder.find_matches(1, &jobs).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_users_without_curriculum_or_plan_are_skipped() {
        let mut inactive = user(2, &[]);
        if let Some(c) = inactive.curriculum.as_mut() {
            c.is_active = false;
        }
        let mut no_curriculum = user(3, &[]);
        no_curriculum.curriculum = None;

        let (finder, _) = finder(Fixture {
            users: vec![user(1, &[]), inactive, no_curriculum, user(4, &[])],
            plans: HashMap::from([(1, plan(0)), (2, plan(0)), (3, plan(0))]),
            ..Fixture::default()
        });

        let matches = finder.find_matches(1, &[job(1, "Engineer")]).await.unwrap();

        let users: Vec<i32> = matches.iter().map(|m| m.user.user_id).collect();
        assert_eq!(users, vec![1]);
    }

    #[tokio::test]
    async fn test_lookup_failure_skips_only_that_user() {
        let (finder, _) = finder(Fixture {
            users: vec![user(1, &[]), user(2, &[])],
            plans: HashMap::from([(1, plan(0)), (2, plan(0))]),
            failing_plan_users: HashSet::from([1]),
            ..Fixture::default()
        });

        let matches = finder.find_matches(1, &[job(1, "Engineer")]).await.unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].user.user_id, 2);
    }
}
