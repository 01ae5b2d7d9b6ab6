//! One Sentinel run: scrape → snapshot → retention → score → filter → route
//! → dedupe → email → mark sent.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::SentinelError;
use crate::scoring::{analyze_batch, filter_by_score, jobs_for_recipient};
use crate::scraping::{scrape_multiple_queries, ScrapePlan};
use crate::state::AppState;
use crate::storage::snapshots::SavedSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Success,
    NoNewJobs,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::NoNewJobs => "NO NEW JOBS",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub scraped: usize,
    pub analyzed: usize,
    pub qualified: usize,
    /// Jobs emailed, summed over recipients.
    pub sent: usize,
    pub recipients_notified: usize,
    pub snapshot: Option<SavedSnapshot>,
    pub files_cleaned: usize,
    pub status: RunStatus,
}

impl RunSummary {
    fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            duration: Duration::ZERO,
            scraped: 0,
            analyzed: 0,
            qualified: 0,
            sent: 0,
            recipients_notified: 0,
            snapshot: None,
            files_cleaned: 0,
            status: RunStatus::NoNewJobs,
        }
    }

    fn finish(mut self, timer: Instant) -> Self {
        self.duration = timer.elapsed();
        self.status = if self.sent > 0 {
            RunStatus::Success
        } else {
            RunStatus::NoNewJobs
        };
        info!(
            run_id = %self.run_id,
            duration_secs = self.duration.as_secs_f64(),
            scraped = self.scraped,
            analyzed = self.analyzed,
            qualified = self.qualified,
            sent = self.sent,
            recipients_notified = self.recipients_notified,
            status = %self.status,
            "Run finished"
        );
        self
    }
}

/// Executes one full run. `now` is the run's wall-clock start in local time;
/// snapshot names use its local form, history timestamps its UTC form.
pub async fn run(state: &AppState, now: DateTime<FixedOffset>) -> Result<RunSummary, SentinelError> {
    let timer = Instant::now();
    let config = &state.config;
    let started_at = now.with_timezone(&Utc);
    let today = now.date_naive();
    let mut summary = RunSummary::new(Uuid::new_v4(), started_at);

    info!(run_id = %summary.run_id, started_at = %now.format("%Y-%m-%d %H:%M:%S"), "Starting run");

    // 1. Scrape
    let search_terms = config.search_terms();
    let plan = ScrapePlan {
        sites: &config.sites,
        search_terms: &search_terms,
        locations: &config.locations,
        results_wanted: config.results_wanted,
        hours_old: config.hours_old,
    };
    let jobs = scrape_multiple_queries(state.source.as_ref(), &plan, started_at).await;
    summary.scraped = jobs.len();

    if jobs.is_empty() {
        warn!("No jobs found, sending empty notifications");
        notify_empty(state, today).await;
        return Ok(summary.finish(timer));
    }

    // 2. Snapshot + retention
    let saved = state.snapshots.save_run(&jobs, now.naive_local())?;
    summary.snapshot = Some(saved);
    match state
        .snapshots
        .cleanup_old_files(config.retention_days, now.naive_local())
    {
        Ok(n) => summary.files_cleaned = n,
        Err(e) => warn!("Retention sweep failed: {e}"),
    }

    // 3. Score + filter
    let scored = analyze_batch(
        state.scorer.as_ref(),
        jobs,
        &search_terms,
        Duration::from_millis(config.analyze_delay_ms),
        config.min_score,
    )
    .await;
    summary.analyzed = scored.len();

    let (qualified, _report) = filter_by_score(scored, config.min_score);
    summary.qualified = qualified.len();

    if qualified.is_empty() {
        warn!(min_score = config.min_score, "No jobs met the threshold, sending empty notifications");
        notify_empty(state, today).await;
        return Ok(summary.finish(timer));
    }

    // 4. Per recipient: route, dedupe, send, mark
    for recipient in &config.recipients {
        let routed = jobs_for_recipient(&qualified, recipient);
        let fresh = state.history.filter_new_jobs(&recipient.email, routed).await?;

        if fresh.is_empty() {
            info!(recipient = %recipient.email, "No new jobs for recipient");
            continue;
        }

        if !state.email.send_daily_digest(&recipient.email, &fresh, today).await {
            error!(recipient = %recipient.email, "Digest not delivered; jobs stay unsent");
            continue;
        }

        for job in &fresh {
            state.history.mark_as_sent(&recipient.email, job, started_at).await?;
        }
        info!(recipient = %recipient.email, count = fresh.len(), "Marked jobs as sent");

        summary.sent += fresh.len();
        summary.recipients_notified += 1;
    }

    // 5. Storage stats
    match state.snapshots.statistics() {
        Ok(stats) => info!(
            total_files = stats.total_files,
            json_files = stats.json_files,
            csv_files = stats.csv_files,
            total_jobs = stats.total_jobs,
            size_mb = stats.total_size_mb(),
            oldest = stats.oldest_file.as_deref().unwrap_or("-"),
            newest = stats.newest_file.as_deref().unwrap_or("-"),
            "Snapshot storage"
        ),
        Err(e) => warn!("Could not read snapshot statistics: {e}"),
    }

    Ok(summary.finish(timer))
}

async fn notify_empty(state: &AppState, today: chrono::NaiveDate) {
    for recipient in &state.config.recipients {
        state.email.send_empty_notification(&recipient.email, today).await;
    }
}
