//! Listing crawl shared by the selector and headless strategies.
//!
//! Pages are walked one at a time following the next-page link; detail pages
//! are then fetched through a bounded pool. Nothing is spawned, so dropping
//! the future cancels every in-flight request.
//!
//! Every fetch is bounded by the crawl deadline. Once it passes, pagination
//! stops and the remaining jobs keep their listing data, so a slow site still
//! yields what was collected.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use scrapjobs_common::config::ScraperSettings;
use scrapjobs_core::models::{JobCandidate, SelectorConfig, SiteScrapingConfig};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ScrapeError, ScrapeResult};
use crate::fetch::PageFetcher;
use crate::parse::{self, ListingItem};

/// Bounds of one crawl.
#[derive(Debug, Clone, Copy)]
pub struct CrawlOptions {
    /// Upper bound on listing pages visited.
    pub max_pages: usize,
    /// Detail pages fetched concurrently.
    pub detail_concurrency: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: 50,
            detail_concurrency: 8,
        }
    }
}

impl From<&ScraperSettings> for CrawlOptions {
    fn from(settings: &ScraperSettings) -> Self {
        Self {
            max_pages: settings.max_pages.max(1),
            detail_concurrency: settings.detail_concurrency.max(1),
        }
    }
}

fn is_set(selector: Option<&String>) -> bool {
    selector.is_some_and(|s| !s.trim().is_empty())
}

/// Check that the selectors are usable before any request goes out.
pub fn validate_selectors(selectors: &SelectorConfig) -> ScrapeResult<()> {
    parse::compile(parse::required(selectors.job_list_item.as_ref(), "job_list_item")?)?;
    parse::compile(parse::required(selectors.title.as_ref(), "title")?)?;
    for selector in [
        &selectors.link,
        &selectors.location,
        &selectors.next_page,
        &selectors.job_description,
        &selectors.job_requisition_id,
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.trim().is_empty())
    {
        parse::compile(selector)?;
    }
    Ok(())
}

/// Whether detail pages carry anything the selectors can extract.
fn wants_detail(selectors: &SelectorConfig) -> bool {
    is_set(selectors.job_description.as_ref()) || is_set(selectors.job_requisition_id.as_ref())
}

fn start_url(config: &SiteScrapingConfig) -> ScrapeResult<Url> {
    Url::parse(&config.base_url)
        .map_err(|e| ScrapeError::Config(format!("invalid base_url {:?}: {e}", config.base_url)))
}

/// Crawl a site's listing pages and their detail pages until `deadline`.
///
/// With `render` set, listing fetches wait for the job list and detail fetches
/// wait for the description to appear. Only a first listing page that fails or
/// misses the deadline is an error.
pub async fn crawl<F>(
    fetcher: &F,
    config: &SiteScrapingConfig,
    options: CrawlOptions,
    render: bool,
    deadline: Instant,
) -> ScrapeResult<Vec<JobCandidate>>
where
    F: PageFetcher + ?Sized,
{
    let selectors = &config.selectors;
    validate_selectors(selectors)?;
    let start = start_url(config)?;

    let listing_wait = if render {
        selectors.job_list_item.as_deref()
    } else {
        None
    };
    let detail_wait = if render {
        selectors.job_description.as_deref()
    } else {
        None
    };

    let items = walk_listing(fetcher, config, start, options.max_pages, listing_wait, deadline).await?;
    debug!(site = %config.site_name, items = items.len(), "Listing crawl finished");

    let wants_detail = wants_detail(selectors);

    let mut candidates: Vec<(usize, Detail)> = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| async move {
            let detail = if wants_detail {
                enrich(fetcher, config, item, detail_wait, deadline).await
            } else {
                Detail::Fetched(to_candidate(config, item))
            };
            (index, detail)
        })
        .buffer_unordered(options.detail_concurrency.max(1))
        .collect()
        .await;

    candidates.sort_by_key(|(index, _)| *index);
    let cut_off = candidates
        .iter()
        .filter(|(_, d)| matches!(d, Detail::CutOff(_)))
        .count();
    if cut_off > 0 {
        warn!(
            site = %config.site_name,
            jobs = candidates.len(),
            without_detail = cut_off,
            "Crawl deadline reached, keeping listing data for the remaining jobs"
        );
    }

    Ok(candidates
        .into_iter()
        .map(|(_, d)| match d {
            Detail::Fetched(c) | Detail::CutOff(c) => c,
        })
        .collect())
}

async fn walk_listing<F>(
    fetcher: &F,
    config: &SiteScrapingConfig,
    start: Url,
    max_pages: usize,
    wait_for: Option<&str>,
    deadline: Instant,
) -> ScrapeResult<Vec<ListingItem>>
where
    F: PageFetcher + ?Sized,
{
    let started = Instant::now();
    let mut visited: HashSet<Url> = HashSet::new();
    let mut items = Vec::new();
    let mut next = Some(start);

    while let Some(mut url) = next.take() {
        url.set_fragment(None);

        if visited.len() >= max_pages {
            warn!(site = %config.site_name, max_pages, "Page limit reached, stopping pagination");
            break;
        }
        if !visited.insert(url.clone()) {
            debug!(site = %config.site_name, %url, "Next page already visited");
            break;
        }

        let html = match timeout_at(deadline, fetcher.fetch_page(&url, wait_for)).await {
            Ok(Ok(html)) => html,
            Ok(Err(e)) if visited.len() == 1 => return Err(e),
            Ok(Err(e)) => {
                warn!(site = %config.site_name, %url, error = %e, "Listing page failed, keeping earlier pages");
                break;
            }
            Err(_) if visited.len() == 1 => return Err(ScrapeError::Timeout(started.elapsed())),
            Err(_) => {
                warn!(
                    site = %config.site_name,
                    %url,
                    pages = visited.len() - 1,
                    "Crawl deadline reached, keeping earlier pages"
                );
                break;
            }
        };

        let page = parse::parse_listing(&html, &url, &config.selectors)?;
        items.extend(page.items);
        next = page.next_page;
    }

    Ok(items)
}

enum Detail {
    Fetched(JobCandidate),
    CutOff(JobCandidate),
}

fn to_candidate(config: &SiteScrapingConfig, item: ListingItem) -> JobCandidate {
    JobCandidate {
        title: item.title,
        location: item.location,
        company: config.site_name.clone(),
        link: item.link.map(String::from).unwrap_or_default(),
        requisition_id: item.requisition_id,
        description: None,
    }
}

async fn enrich<F>(
    fetcher: &F,
    config: &SiteScrapingConfig,
    item: ListingItem,
    wait_for: Option<&str>,
    deadline: Instant,
) -> Detail
where
    F: PageFetcher + ?Sized,
{
    let link = item.link.clone();
    let mut candidate = to_candidate(config, item);
    let Some(link) = link else {
        return Detail::Fetched(candidate);
    };

    let detail = match timeout_at(deadline, fetcher.fetch_page(&link, wait_for)).await {
        Ok(Ok(html)) => parse::parse_detail(&html, &config.selectors),
        Ok(Err(e)) => Err(e),
        Err(_) => return Detail::CutOff(candidate),
    };

    match detail {
        Ok(detail) => {
            if detail.description.is_some() {
                candidate.description = detail.description;
            }
            if detail.requisition_id.is_some() {
                candidate.requisition_id = detail.requisition_id;
            }
        }
        Err(e) => {
            warn!(site = %config.site_name, %link, error = %e, "Detail page failed, keeping listing data");
        }
    }

    Detail::Fetched(candidate)
}
