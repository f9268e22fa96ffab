//! Domain types shared by the pipeline stages.
//!
//! These are the shapes carried inside task payloads, so every type here is
//! `Serialize + Deserialize` and must round-trip through JSON unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use scrapjobs_common::AppError;
use scrapjobs_db::entities::{curriculum, job, plan, site_scraping_config};
use scrapjobs_db::repositories::SubscriberRow;
use serde::{Deserialize, Serialize};

/// Extraction strategy of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapingType {
    /// Fetch HTML over HTTP and walk it with CSS selectors.
    #[serde(alias = "HTML", alias = "html")]
    Selector,
    /// Call a JSON API and map fields with paths.
    #[serde(alias = "API")]
    Api,
    /// Render the page in a browser, then walk it with CSS selectors.
    #[serde(alias = "HEADLESS")]
    Headless,
}

impl FromStr for ScrapingType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "selector" => Ok(Self::Selector),
            "api" => Ok(Self::Api),
            "headless" => Ok(Self::Headless),
            other => Err(AppError::Config(format!("unknown scraping type: {other}"))),
        }
    }
}

impl fmt::Display for ScrapingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Selector => "selector",
            Self::Api => "api",
            Self::Headless => "headless",
        };
        write!(f, "{s}")
    }
}

/// CSS selectors used by the selector and headless strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub job_list_item: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    /// Attribute holding the URL on the link element, `href` when unset
    pub link_attribute: Option<String>,
    pub location: Option<String>,
    pub next_page: Option<String>,
    pub job_description: Option<String>,
    pub job_requisition_id: Option<String>,
}

/// Where to find jobs and their fields inside an API response.
///
/// Paths are dot separated; numeric segments index into arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonMapping {
    #[serde(default)]
    pub jobs_array_path: String,
    #[serde(default)]
    pub title_path: String,
    #[serde(default)]
    pub link_path: Option<String>,
    #[serde(default)]
    pub location_path: Option<String>,
    #[serde(default)]
    pub description_path: Option<String>,
    #[serde(default)]
    pub requisition_id_path: Option<String>,
}

/// Request description used by the API strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// URL of the endpoint; `{base_url}` is substituted
    pub endpoint_template: Option<String>,
    /// HTTP method, `GET` when unset
    pub method: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// JSON request body
    pub payload_template: Option<String>,
    pub json_mapping: Option<JsonMapping>,
}

/// How to extract postings from one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteScrapingConfig {
    pub id: i32,
    pub site_name: String,
    pub base_url: String,
    pub is_active: bool,
    pub scraping_type: ScrapingType,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl TryFrom<site_scraping_config::Model> for SiteScrapingConfig {
    type Error = AppError;

    fn try_from(model: site_scraping_config::Model) -> Result<Self, Self::Error> {
        let scraping_type: ScrapingType = model.scraping_type.parse()?;

        let headers = match model.api_headers_json {
            None | Some(serde_json::Value::Null) => BTreeMap::new(),
            Some(serde_json::Value::Object(map)) => map
                .into_iter()
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (k, value)
                })
                .collect(),
            Some(_) => {
                return Err(AppError::Config(format!(
                    "site {}: api headers must be a JSON object",
                    model.id
                )));
            }
        };

        let json_mapping = match model.json_data_mappings {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(serde_json::from_value::<JsonMapping>(value).map_err(|e| {
                AppError::Config(format!("site {}: invalid json mapping: {e}", model.id))
            })?),
        };

        Ok(Self {
            id: model.id,
            site_name: model.site_name,
            base_url: model.base_url,
            is_active: model.is_active,
            scraping_type,
            selectors: SelectorConfig {
                job_list_item: model.job_list_item_selector,
                title: model.title_selector,
                link: model.link_selector,
                link_attribute: model.link_attribute,
                location: model.location_selector,
                next_page: model.next_page_selector,
                job_description: model.job_description_selector,
                job_requisition_id: model.job_requisition_id_selector,
            },
            api: ApiConfig {
                endpoint_template: model.api_endpoint_template,
                method: model.api_method,
                headers,
                payload_template: model.api_payload_template,
                json_mapping,
            },
        })
    }
}

/// A posting as extracted by a scraper, before it is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCandidate {
    pub title: String,
    pub location: String,
    pub company: String,
    pub link: String,
    pub requisition_id: Option<i64>,
    pub description: Option<String>,
}

/// A stored posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: i32,
    pub site_id: i32,
    pub title: String,
    pub location: String,
    pub company: String,
    pub link: String,
    pub requisition_id: i64,
    pub description: Option<String>,
    pub last_seen_at: DateTime<Utc>,
}

impl Job {
    /// Attach storage identity to a scraped candidate.
    #[must_use]
    pub fn from_candidate(
        id: i32,
        site_id: i32,
        requisition_id: i64,
        candidate: JobCandidate,
        seen_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            site_id,
            title: candidate.title,
            location: candidate.location,
            company: candidate.company,
            link: candidate.link,
            requisition_id,
            description: candidate.description,
            last_seen_at: seen_at,
        }
    }
}

impl From<job::Model> for Job {
    fn from(model: job::Model) -> Self {
        Self {
            id: model.id,
            site_id: model.site_id,
            title: model.title,
            location: model.location,
            company: model.company,
            link: model.job_link,
            requisition_id: model.requisition_id,
            description: model.description,
            last_seen_at: model.last_seen_at.with_timezone(&Utc),
        }
    }
}

/// Work experience entry of a curriculum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Education entry of a curriculum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

/// A user's resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub is_active: bool,
    pub summary: String,
    pub skills: String,
    pub languages: String,
    pub experiences: Vec<Experience>,
    pub educations: Vec<Education>,
}

impl From<curriculum::Model> for Curriculum {
    fn from(model: curriculum::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            is_active: model.is_active,
            summary: model.summary,
            skills: model.skills,
            languages: model.languages,
            experiences: serde_json::from_value(model.experiences).unwrap_or_default(),
            educations: serde_json::from_value(model.educations).unwrap_or_default(),
        }
    }
}

/// A subscriber of a site, with the data needed to match and notify them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSiteCurriculum {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub curriculum: Option<Curriculum>,
    /// Keywords matched against job titles
    #[serde(default)]
    pub target_words: Vec<String>,
}

impl UserSiteCurriculum {
    /// The curriculum, if the user has an active one.
    #[must_use]
    pub fn active_curriculum(&self) -> Option<&Curriculum> {
        self.curriculum.as_ref().filter(|c| c.is_active)
    }
}

impl From<SubscriberRow> for UserSiteCurriculum {
    fn from(row: SubscriberRow) -> Self {
        Self {
            user_id: row.user.id,
            name: row.user.name,
            email: row.user.email,
            curriculum: row.curriculum.map(Curriculum::from),
            target_words: row.filters,
        }
    }
}

/// Subscription plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub max_sites: i32,
    pub max_ai_analyses: i32,
    pub features: Vec<String>,
}

impl Plan {
    /// Monthly analysis allowance, `None` when unlimited.
    #[must_use]
    pub const fn analysis_quota(&self) -> Option<u64> {
        if self.max_ai_analyses > 0 {
            Some(self.max_ai_analyses as u64)
        } else {
            None
        }
    }
}

impl From<plan::Model> for Plan {
    fn from(model: plan::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            max_sites: model.max_sites,
            max_ai_analyses: model.max_ai_analyses,
            features: serde_json::from_value(model.features).unwrap_or_default(),
        }
    }
}

/// Overall fit of a curriculum for a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAnalysis {
    #[serde(default)]
    pub overall_score_numeric: f64,
    #[serde(default)]
    pub overall_score_qualitative: String,
    #[serde(default)]
    pub summary: String,
}

/// A strength of the candidate for the job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strength {
    #[serde(default)]
    pub point: String,
    #[serde(default)]
    pub relevance_to_job: String,
}

/// A gap between the curriculum and the job requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    #[serde(default)]
    pub area_description: String,
    #[serde(default)]
    pub job_requirement_impacted: String,
}

/// A concrete resume change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub curriculum_section_to_apply: String,
    #[serde(default)]
    pub example_wording: String,
    #[serde(default)]
    pub reasoning_for_this_job: String,
}

/// AI generated fit analysis of a curriculum for a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysis {
    pub match_analysis: MatchAnalysis,
    #[serde(default)]
    pub strengths_for_this_job: Vec<Strength>,
    #[serde(default)]
    pub gaps_and_improvement_areas: Vec<Gap>,
    #[serde(default)]
    pub actionable_resume_suggestions: Vec<Suggestion>,
    #[serde(default)]
    pub final_considerations: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn site_model() -> site_scraping_config::Model {
        site_scraping_config::Model {
            id: 3,
            site_name: "Acme".to_string(),
            base_url: "https://acme.example".to_string(),
            is_active: true,
            scraping_type: "API".to_string(),
            job_list_item_selector: None,
            title_selector: None,
            link_selector: None,
            link_attribute: None,
            location_selector: None,
            next_page_selector: None,
            job_description_selector: None,
            job_requisition_id_selector: None,
            api_endpoint_template: Some("{base_url}/api/jobs".to_string()),
            api_method: Some("POST".to_string()),
            api_headers_json: Some(json!({"X-Token": "abc", "X-Version": 2})),
            api_payload_template: Some("{\"page\":1}".to_string()),
            json_data_mappings: Some(json!({
                "jobs_array_path": "results",
                "title_path": "t",
                "requisition_id_path": "id"
            })),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_scraping_type_parse() {
        assert_eq!("HTML".parse::<ScrapingType>().unwrap(), ScrapingType::Selector);
        assert_eq!("api".parse::<ScrapingType>().unwrap(), ScrapingType::Api);
        assert_eq!("Headless".parse::<ScrapingType>().unwrap(), ScrapingType::Headless);
        assert!(matches!(
            "RSS".parse::<ScrapingType>(),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_scraping_type_accepts_storage_names() {
        let parsed: ScrapingType = serde_json::from_value(json!("HEADLESS")).unwrap();
        assert_eq!(parsed, ScrapingType::Headless);
        assert_eq!(serde_json::to_value(ScrapingType::Selector).unwrap(), json!("selector"));
    }

    #[test]
    fn test_site_config_from_model() {
        let config = SiteScrapingConfig::try_from(site_model()).unwrap();

        assert_eq!(config.scraping_type, ScrapingType::Api);
        assert_eq!(config.api.headers.get("X-Token").unwrap(), "abc");
        assert_eq!(config.api.headers.get("X-Version").unwrap(), "2");
        let mapping = config.api.json_mapping.unwrap();
        assert_eq!(mapping.jobs_array_path, "results");
        assert_eq!(mapping.requisition_id_path.as_deref(), Some("id"));
        assert!(mapping.link_path.is_none());
    }

    #[test]
    fn test_site_config_unknown_type_is_config_error() {
        let mut model = site_model();
        model.scraping_type = "FTP".to_string();

        assert!(matches!(
            SiteScrapingConfig::try_from(model),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_site_config_rejects_non_object_headers() {
        let mut model = site_model();
        model.api_headers_json = Some(json!(["a"]));

        assert!(SiteScrapingConfig::try_from(model).is_err());
    }

    #[test]
    fn test_plan_quota() {
        let mut plan = Plan {
            id: 1,
            name: "Free".to_string(),
            price: 0.0,
            max_sites: 1,
            max_ai_analyses: 5,
            features: vec![],
        };
        assert_eq!(plan.analysis_quota(), Some(5));

        plan.max_ai_analyses = 0;
        assert_eq!(plan.analysis_quota(), None);

        plan.max_ai_analyses = -1;
        assert_eq!(plan.analysis_quota(), None);
    }

    #[test]
    fn test_resume_analysis_reads_camel_case() {
        let analysis: ResumeAnalysis = serde_json::from_value(json!({
            "matchAnalysis": {
                "overallScoreNumeric": 82,
                "overallScoreQualitative": "Strong",
                "summary": "Good fit"
            },
            "strengthsForThisJob": [{"point": "Rust", "relevanceToJob": "Core stack"}],
            "finalConsiderations": "Apply"
        }))
        .unwrap();

        assert!((analysis.match_analysis.overall_score_numeric - 82.0).abs() < f64::EPSILON);
        assert_eq!(analysis.strengths_for_this_job[0].relevance_to_job, "Core stack");
        assert!(analysis.gaps_and_improvement_areas.is_empty());
    }

    #[test]
    fn test_active_curriculum() {
        let mut user = UserSiteCurriculum {
            user_id: 1,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            curriculum: Some(Curriculum {
                is_active: false,
                ..Curriculum::default()
            }),
            target_words: vec![],
        };
        assert!(user.active_curriculum().is_none());

        if let Some(c) = user.curriculum.as_mut() {
            c.is_active = true;
        }
        assert!(user.active_curriculum().is_some());
    }
}
