//! HTML listing and detail page parsing.
//!
//! Parsed documents are not `Send`, so everything here is synchronous and
//! returns owned data. Callers must not hold a document across an `.await`.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use scrapjobs_core::models::SelectorConfig;
use url::Url;

use crate::error::{ScrapeError, ScrapeResult};

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// One entry of a listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingItem {
    pub title: String,
    pub location: String,
    /// Absolute link to the detail page.
    pub link: Option<Url>,
    pub requisition_id: Option<i64>,
}

/// A parsed listing page.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub items: Vec<ListingItem>,
    /// Absolute URL of the next page, if the page links one.
    pub next_page: Option<Url>,
}

/// Fields read from a detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub description: Option<String>,
    pub requisition_id: Option<i64>,
}

/// Compile a CSS selector.
pub fn compile(selector: &str) -> ScrapeResult<Selector> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn compile_opt(selector: Option<&String>) -> ScrapeResult<Option<Selector>> {
    selector
        .filter(|s| !s.trim().is_empty())
        .map(|s| compile(s))
        .transpose()
}

/// Require a non-empty selector.
pub fn required<'a>(selector: Option<&'a String>, name: &str) -> ScrapeResult<&'a str> {
    selector
        .map(String::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ScrapeError::Config(format!("selector `{name}` is required")))
}

/// Parse a requisition id.
///
/// The trimmed text is read as an integer; otherwise the first run of digits
/// is used.
#[must_use]
pub fn parse_requisition_id(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(id) = text.parse::<i64>() {
        return Some(id);
    }
    DIGITS.find(text).and_then(|m| m.as_str().parse().ok())
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize(&element.text().collect::<String>())
}

fn child_text(element: ElementRef<'_>, selector: Option<&Selector>) -> String {
    selector
        .and_then(|s| element.select(s).next())
        .map(element_text)
        .unwrap_or_default()
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    base.join(href).ok()
}

/// Parse a listing page fetched from `page_url`.
pub fn parse_listing(
    html: &str,
    page_url: &Url,
    selectors: &SelectorConfig,
) -> ScrapeResult<ListingPage> {
    let item_selector = compile(required(selectors.job_list_item.as_ref(), "job_list_item")?)?;
    let title_selector = compile(required(selectors.title.as_ref(), "title")?)?;
    let link_selector = compile_opt(selectors.link.as_ref())?;
    let location_selector = compile_opt(selectors.location.as_ref())?;
    let requisition_selector = compile_opt(selectors.job_requisition_id.as_ref())?;
    let next_selector = compile_opt(selectors.next_page.as_ref())?;
    let link_attribute = selectors
        .link_attribute
        .as_deref()
        .filter(|a| !a.is_empty())
        .unwrap_or("href");

    let document = Html::parse_document(html);

    let items = document
        .select(&item_selector)
        .map(|item| {
            let link_element = match &link_selector {
                Some(s) => item.select(s).next(),
                None => Some(item),
            };
            let link = link_element
                .and_then(|el| el.value().attr(link_attribute))
                .and_then(|href| resolve(page_url, href));

            ListingItem {
                title: child_text(item, Some(&title_selector)),
                location: child_text(item, location_selector.as_ref()),
                link,
                requisition_id: requisition_selector
                    .as_ref()
                    .and_then(|s| item.select(s).next())
                    .and_then(|el| parse_requisition_id(&element_text(el))),
            }
        })
        .collect();

    let next_page = next_selector
        .as_ref()
        .and_then(|s| document.select(s).next())
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| resolve(page_url, href));

    Ok(ListingPage { items, next_page })
}

/// Parse a job detail page.
pub fn parse_detail(html: &str, selectors: &SelectorConfig) -> ScrapeResult<DetailFields> {
    let description_selector = compile_opt(selectors.job_description.as_ref())?;
    let requisition_selector = compile_opt(selectors.job_requisition_id.as_ref())?;

    let document = Html::parse_document(html);
    let root = document.root_element();

    let description = description_selector
        .as_ref()
        .map(|s| child_text(root, Some(s)))
        .filter(|d| !d.is_empty());
    let requisition_id = requisition_selector
        .as_ref()
        .map(|s| child_text(root, Some(s)))
        .and_then(|text| parse_requisition_id(&text));

    Ok(DetailFields {
        description,
        requisition_id,
    })
}
