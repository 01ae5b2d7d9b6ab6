//! Per-board actor configuration and dataset item normalization.
//!
//! Each board's Apify actor takes its own input shape and emits its own field
//! names; everything downstream sees only `JobPosting`.

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::models::job::{JobPosting, Site};
use crate::scraping::SearchQuery;

/// Actor ID for misceres/indeed-scraper.
const INDEED_ACTOR: &str = "misceres~indeed-scraper";
/// Actor ID for bebity/linkedin-jobs-scraper.
const LINKEDIN_ACTOR: &str = "bebity~linkedin-jobs-scraper";

const TITLE_KEYS: &[&str] = &["title", "positionName", "jobTitle"];
const COMPANY_KEYS: &[&str] = &["company", "companyName"];
const LOCATION_KEYS: &[&str] = &["location", "jobLocation", "place"];
const URL_KEYS: &[&str] = &["jobUrl", "url", "link", "externalApplyLink"];
const DESCRIPTION_KEYS: &[&str] = &["description", "descriptionText", "jobDescription"];
const DATE_KEYS: &[&str] = &["postingDateParsed", "publishedAt", "postedAt", "datePosted"];

pub fn actor_id(site: Site) -> &'static str {
    match site {
        Site::Indeed => INDEED_ACTOR,
        Site::LinkedIn => LINKEDIN_ACTOR,
    }
}

/// Builds the actor input for one search.
pub fn actor_input(query: &SearchQuery) -> Value {
    match query.site {
        Site::Indeed => json!({
            "position": query.term,
            "location": query.location,
            "country": "US",
            "maxItems": query.results_wanted,
            "parseCompanyDetails": false,
            "saveOnlyUniqueItems": true,
            "followApplyRedirects": false,
        }),
        Site::LinkedIn => json!({
            "title": query.term,
            "location": query.location,
            "rows": query.results_wanted,
            "publishedAt": linkedin_time_filter(query.hours_old),
            "proxy": {"useApifyProxy": true, "apifyProxyGroups": ["RESIDENTIAL"]},
        }),
    }
}

/// LinkedIn's `f_TPR` filter is expressed as `r<seconds>`.
fn linkedin_time_filter(hours_old: u32) -> String {
    format!("r{}", u64::from(hours_old) * 3600)
}

/// Converts one dataset item into a posting. Items with neither a title nor a URL are dropped.
pub fn normalize_item(item: &Value, query: &SearchQuery) -> Option<JobPosting> {
    let title = first_str(item, TITLE_KEYS);
    let job_url = first_str(item, URL_KEYS);
    if title.is_empty() && job_url.is_empty() {
        return None;
    }

    Some(JobPosting {
        title,
        company: first_str(item, COMPANY_KEYS),
        location: first_str(item, LOCATION_KEYS),
        job_url,
        description: first_str(item, DESCRIPTION_KEYS),
        site: query.site,
        date_posted: parse_posted_date(&first_str(item, DATE_KEYS)),
        search_term: query.term.clone(),
        search_location: query.location.clone(),
    })
}

fn first_str(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| item.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Accepts `YYYY-MM-DD` optionally followed by a time part.
fn parse_posted_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
