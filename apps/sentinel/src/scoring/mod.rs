//! Job scoring — pluggable, trait-based scorer plus batch analysis and filtering.
//!
//! Default: `LlmJobScorer` (Claude). Offline: `KeywordJobScorer` (deterministic).
//! The pipeline holds an `Arc<dyn JobScorer>`, chosen at startup via `SCORER`.

pub mod keyword;
pub mod llm;
pub mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Recipient;
use crate::errors::SentinelError;
use crate::models::job::{JobEvaluation, JobPosting, ScoredJob};

/// Postings with shorter descriptions are not worth a scoring call.
pub const MIN_DESCRIPTION_CHARS: usize = 50;

/// The job scorer trait. Implement this to swap backends without touching
/// the pipeline.
#[async_trait]
pub trait JobScorer: Send + Sync {
    /// "llm" | "keyword" — for logs.
    fn backend(&self) -> &'static str;

    async fn evaluate(
        &self,
        job: &JobPosting,
        search_terms: &[String],
    ) -> Result<JobEvaluation, SentinelError>;
}

/// Evaluates postings one at a time, pausing `delay` between scorer calls.
///
/// Short descriptions are marked skipped without a call. Scorer failures are
/// logged and recorded as a permissive evaluation flagged `error` with
/// `fallback_score`, so a flaky API does not silently drop postings.
pub async fn analyze_batch(
    scorer: &dyn JobScorer,
    jobs: Vec<JobPosting>,
    search_terms: &[String],
    delay: Duration,
    fallback_score: u8,
) -> Vec<ScoredJob> {
    let total = jobs.len();
    let mut scored = Vec::with_capacity(total);
    let mut called = false;

    info!(backend = scorer.backend(), total, "Analyzing postings");

    for (i, job) in jobs.into_iter().enumerate() {
        if (i + 1) % 10 == 0 {
            info!("Evaluating {}/{}...", i + 1, total);
        }

        let description_chars = job.description.trim().chars().count();
        if description_chars < MIN_DESCRIPTION_CHARS {
            info!(
                title = %job.display_title(),
                description_chars,
                "Skipping posting with no/short description"
            );
            let evaluation = JobEvaluation::skipped("No description available - skipped");
            scored.push(ScoredJob { job, evaluation });
            continue;
        }

        if called && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        called = true;

        let evaluation = match scorer.evaluate(&job, search_terms).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(title = %job.display_title(), "Evaluation failed: {e}");
                let message: String = e.to_string().chars().take(50).collect();
                let mut evaluation =
                    JobEvaluation::permissive(fallback_score, format!("Scoring error: {message}"));
                evaluation.error = true;
                evaluation
            }
        };

        scored.push(ScoredJob { job, evaluation });
    }

    scored
}

/// Why postings were dropped by `filter_by_score`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterReport {
    pub skipped: usize,
    pub keyword_mismatch: usize,
    pub not_entry_level: usize,
    pub phd_required: usize,
    pub below_threshold: usize,
    pub passed: usize,
}

/// Keeps evaluated postings that pass the criteria gate and reach `min_score`,
/// highest score first (ties keep scrape order).
pub fn filter_by_score(scored: Vec<ScoredJob>, min_score: u8) -> (Vec<ScoredJob>, FilterReport) {
    let mut report = FilterReport::default();
    let mut kept = Vec::new();

    for job in scored {
        let eval = &job.evaluation;
        if eval.skipped {
            report.skipped += 1;
        } else if !eval.keyword_match {
            report.keyword_mismatch += 1;
        } else if !eval.entry_level {
            report.not_entry_level += 1;
        } else if eval.requires_phd {
            report.phd_required += 1;
        } else if eval.score < min_score {
            report.below_threshold += 1;
        } else {
            kept.push(job);
        }
    }

    kept.sort_by(|a, b| b.evaluation.score.cmp(&a.evaluation.score));
    report.passed = kept.len();

    info!(
        skipped = report.skipped,
        keyword_mismatch = report.keyword_mismatch,
        not_entry_level = report.not_entry_level,
        phd_required = report.phd_required,
        below_threshold = report.below_threshold,
        passed = report.passed,
        min_score,
        "Filtered postings"
    );

    (kept, report)
}

/// Postings routed to one recipient: surfaced by one of their search terms,
/// and offering sponsorship if they need it.
pub fn jobs_for_recipient(jobs: &[ScoredJob], recipient: &Recipient) -> Vec<ScoredJob> {
    let terms: Vec<String> = recipient
        .search_terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .collect();

    jobs.iter()
        .filter(|j| terms.contains(&j.job.search_term.trim().to_lowercase()))
        .filter(|j| !recipient.needs_sponsorship || j.evaluation.visa_sponsorship)
        .cloned()
        .collect()
}
