//! Job-board scraping — pluggable source trait plus the multi-query driver.

pub mod apify;
pub mod boards;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::SentinelError;
use crate::models::job::{JobPosting, Site};
use crate::scraping::apify::ApifyClient;

/// One board search: a single term in a single location.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub site: Site,
    pub term: String,
    pub location: String,
    pub results_wanted: u32,
    pub hours_old: u32,
}

/// The scraping seam. Implement this to swap how postings are fetched.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<JobPosting>, SentinelError>;
}

/// Scrapes boards through their Apify actors.
pub struct ApifyJobSource {
    client: ApifyClient,
}

impl ApifyJobSource {
    pub fn new(client: ApifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobSource for ApifyJobSource {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<JobPosting>, SentinelError> {
        let input = boards::actor_input(query);
        let items: Vec<Value> = self
            .client
            .run_actor(boards::actor_id(query.site), &input)
            .await?;

        Ok(items
            .iter()
            .filter_map(|item| boards::normalize_item(item, query))
            .collect())
    }
}

/// Parameters for a full scrape across sites, terms and locations.
#[derive(Debug, Clone)]
pub struct ScrapePlan<'a> {
    pub sites: &'a [Site],
    pub search_terms: &'a [String],
    pub locations: &'a [String],
    pub results_wanted: u32,
    pub hours_old: u32,
}

impl ScrapePlan<'_> {
    pub fn queries(&self) -> Vec<SearchQuery> {
        let mut queries = Vec::new();
        for term in self.search_terms {
            for location in self.locations {
                for site in self.sites {
                    queries.push(SearchQuery {
                        site: *site,
                        term: term.clone(),
                        location: location.clone(),
                        results_wanted: self.results_wanted,
                        hours_old: self.hours_old,
                    });
                }
            }
        }
        queries
    }
}

/// Runs every query, skipping failing ones, and returns postings that are
/// recent enough and unique by `job_key` (first occurrence wins).
pub async fn scrape_multiple_queries(
    source: &dyn JobSource,
    plan: &ScrapePlan<'_>,
    now: DateTime<Utc>,
) -> Vec<JobPosting> {
    // A window reaching before the calendar's start keeps every posting.
    let cutoff = now
        .checked_sub_signed(Duration::hours(i64::from(plan.hours_old)))
        .map(|t| t.date_naive());
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();

    for query in plan.queries() {
        info!(
            site = %query.site,
            term = %query.term,
            location = %query.location,
            "Searching"
        );

        let found = match source.search(&query).await {
            Ok(found) => found,
            Err(e) => {
                warn!(site = %query.site, term = %query.term, "Query failed, skipping: {e}");
                continue;
            }
        };

        let before = jobs.len();
        let total = found.len();
        for job in found {
            if cutoff.is_some_and(|cutoff| job.date_posted.is_some_and(|d| d < cutoff)) {
                continue;
            }
            if seen.insert(job.job_key()) {
                jobs.push(job);
            }
        }
        info!(found = total, kept = jobs.len() - before, "Query finished");
    }

    info!(count = jobs.len(), "Scraped unique postings");
    jobs
}
