//! API strategy: one JSON request, fields picked out by path.

use async_trait::async_trait;
use reqwest::Method;
use scrapjobs_core::models::{JobCandidate, JsonMapping, SiteScrapingConfig};
use serde_json::Value;
use tokio::time::{Instant, timeout_at};
use url::Url;

use crate::Scraper;
use crate::error::{ScrapeError, ScrapeResult};
use crate::parse::parse_requisition_id;

/// Scrapes sites exposing a JSON job search API.
#[derive(Clone)]
pub struct ApiScraper {
    client: reqwest::Client,
}

/// A validated API request.
#[derive(Debug)]
struct ApiRequest<'a> {
    url: Url,
    method: Method,
    body: Option<String>,
    mapping: &'a JsonMapping,
}

impl ApiScraper {
    /// Create a new API scraper.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn prepare(config: &SiteScrapingConfig) -> ScrapeResult<ApiRequest<'_>> {
    let api = &config.api;
    let template = api
        .endpoint_template
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            ScrapeError::Config(format!("site {}: api endpoint template is required", config.id))
        })?;
    let mapping = api.json_mapping.as_ref().ok_or_else(|| {
        ScrapeError::Config(format!("site {}: json mapping is required", config.id))
    })?;
    if mapping.jobs_array_path.trim().is_empty() || mapping.title_path.trim().is_empty() {
        return Err(ScrapeError::Config(format!(
            "site {}: json mapping needs jobs_array_path and title_path",
            config.id
        )));
    }

    let endpoint = template.replace("{base_url}", config.base_url.trim_end_matches('/'));
    let url = Url::parse(&endpoint)
        .map_err(|e| ScrapeError::Config(format!("invalid api endpoint {endpoint:?}: {e}")))?;

    let method = match api.method.as_deref().map(str::trim) {
        None | Some("") => Method::GET,
        Some(m) => Method::from_bytes(m.to_uppercase().as_bytes())
            .map_err(|_| ScrapeError::Config(format!("invalid api method {m:?}")))?,
    };

    let body = api
        .payload_template
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.replace("{base_url}", config.base_url.trim_end_matches('/')));

    Ok(ApiRequest {
        url,
        method,
        body,
        mapping,
    })
}

/// Follow a dot-separated path; numeric segments index into arrays.
#[must_use]
pub fn value_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn string_at(value: &Value, path: Option<&str>) -> Option<String> {
    match value_at(value, path?)? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn requisition_at(value: &Value, path: Option<&str>) -> Option<i64> {
    match value_at(value, path?)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => parse_requisition_id(s),
        _ => None,
    }
}

/// Turn an API response into candidates.
pub fn extract_candidates(
    body: &Value,
    mapping: &JsonMapping,
    base: Option<&Url>,
    company: &str,
) -> ScrapeResult<Vec<JobCandidate>> {
    let jobs = value_at(body, &mapping.jobs_array_path)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ScrapeError::Json(format!("array path not found: {}", mapping.jobs_array_path))
        })?;

    Ok(jobs
        .iter()
        .map(|job| {
            let link = string_at(job, mapping.link_path.as_deref()).unwrap_or_default();
            let link = match base {
                Some(base) if !link.is_empty() => {
                    base.join(&link).map(String::from).unwrap_or(link)
                }
                _ => link,
            };

            JobCandidate {
                title: string_at(job, Some(&mapping.title_path)).unwrap_or_default(),
                location: string_at(job, mapping.location_path.as_deref()).unwrap_or_default(),
                company: company.to_string(),
                link,
                requisition_id: requisition_at(job, mapping.requisition_id_path.as_deref()),
                description: string_at(job, mapping.description_path.as_deref()),
            }
        })
        .collect())
}

#[async_trait]
impl Scraper for ApiScraper {
    async fn scrape(
        &self,
        config: &SiteScrapingConfig,
        deadline: Instant,
    ) -> ScrapeResult<Vec<JobCandidate>> {
        let request = prepare(config)?;
        let started = Instant::now();

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .header("Accept", "application/json");
        for (name, value) in &config.api.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.header("Content-Type", "application/json").body(body);
        }

        let fetch = async {
            let response = builder.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ScrapeError::Status {
                    status: status.as_u16(),
                    url: request.url.to_string(),
                });
            }
            Ok(response.text().await?)
        };
        let text = timeout_at(deadline, fetch)
            .await
            .map_err(|_| ScrapeError::Timeout(started.elapsed()))??;

        let body: Value = serde_json::from_str(&text)?;
        let base = Url::parse(&config.base_url).ok();
        let candidates = extract_candidates(&body, request.mapping, base.as_ref(), &config.site_name)?;

        tracing::debug!(
            site = %config.site_name,
            method = %request.method,
            count = candidates.len(),
            "API scrape finished"
        );
        Ok(candidates)
    }
}
