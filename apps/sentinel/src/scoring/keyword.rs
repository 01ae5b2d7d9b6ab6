//! Pure-Rust keyword scorer. Fast, deterministic, no LLM call.
//!
//! Algorithm:
//! 1. keyword_match: a target role appears in the title (+4) or all of its
//!    words appear in the description (+2)
//! 2. entry_level: no senior marker in the title and no "N+ years" with N > 3 (+3)
//! 3. visa_sponsorship: no explicit rejection phrase (+2), explicit offer (+1)
//! 4. requires_phd: PhD/doctorate mentioned without "preferred"/"plus" → score capped at 3

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::errors::SentinelError;
use crate::models::job::{JobEvaluation, JobPosting};
use crate::scoring::JobScorer;

const SENIOR_TITLE_MARKERS: &[&str] = &[
    "senior", "sr.", "sr ", "staff", "principal", "lead", "manager", "director", "head of", "architect",
];
const ENTRY_MARKERS: &[&str] = &[
    "entry level", "entry-level", "junior", "jr.", "associate", "new grad", "graduate", "early career",
];
const SPONSORSHIP_REJECTIONS: &[&str] = &[
    "no sponsorship",
    "not sponsor",
    "unable to sponsor",
    "cannot sponsor",
    "can not sponsor",
    "will not sponsor",
    "without sponsorship",
    "us citizens only",
    "u.s. citizens only",
    "must be a us citizen",
    "must be a u.s. citizen",
];
const SPONSORSHIP_OFFERS: &[&str] = &["h1b", "h-1b", "visa sponsorship", "sponsorship available"];
const PHD_OPTIONAL: &[&str] = &["phd preferred", "ph.d. preferred", "phd is a plus", "phd a plus", "phd is preferred"];

pub struct KeywordJobScorer;

#[async_trait]
impl JobScorer for KeywordJobScorer {
    fn backend(&self) -> &'static str {
        "keyword"
    }

    async fn evaluate(
        &self,
        job: &JobPosting,
        search_terms: &[String],
    ) -> Result<JobEvaluation, SentinelError> {
        Ok(compute_keyword_evaluation(job, search_terms))
    }
}

fn years_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})\s*\+?\s*(?:-\s*\d{1,2}\s*)?years?").expect("valid regex"))
}

fn phd_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(ph\.?\s?d|doctorate|doctoral)\b").expect("valid regex"))
}

pub fn compute_keyword_evaluation(job: &JobPosting, search_terms: &[String]) -> JobEvaluation {
    let title = job.title.to_lowercase();
    let description = job.description.to_lowercase();

    let mut score: u32 = 0;
    let mut notes = Vec::new();

    let title_match = search_terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .any(|t| !t.is_empty() && title.contains(&t));
    let description_match = !title_match
        && search_terms.iter().any(|t| {
            let words: Vec<String> = t.split_whitespace().map(str::to_lowercase).collect();
            !words.is_empty() && words.iter().all(|w| description.contains(w.as_str()))
        });
    if title_match {
        score += 4;
        notes.push("title matches a target role");
    } else if description_match {
        score += 2;
        notes.push("description mentions a target role");
    }

    let senior_title = SENIOR_TITLE_MARKERS.iter().any(|m| title.contains(m));
    let entry_marker = ENTRY_MARKERS
        .iter()
        .any(|m| title.contains(m) || description.contains(m));
    let min_years = years_regex()
        .captures_iter(&description)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .min();
    let entry_level = !senior_title && (entry_marker || min_years.map_or(true, |y| y <= 3));
    if entry_level {
        score += 3;
        notes.push("entry level");
    }

    let rejects_sponsorship = SPONSORSHIP_REJECTIONS.iter().any(|p| description.contains(p));
    let offers_sponsorship = SPONSORSHIP_OFFERS.iter().any(|p| description.contains(p));
    if !rejects_sponsorship {
        score += 2;
        if offers_sponsorship {
            score += 1;
            notes.push("sponsorship offered");
        }
    } else {
        notes.push("sponsorship rejected");
    }

    let requires_phd =
        phd_regex().is_match(&description) && !PHD_OPTIONAL.iter().any(|p| description.contains(p));
    if requires_phd {
        score = score.min(3);
        notes.push("PhD required");
    }

    let reason = if notes.is_empty() {
        "no signals matched".to_string()
    } else {
        notes.join(", ")
    };

    JobEvaluation {
        score: score.min(10) as u8,
        summary: format!("Keyword heuristic: {reason}."),
        keyword_match: title_match || description_match,
        visa_sponsorship: !rejects_sponsorship,
        entry_level,
        requires_phd,
        reason,
        skipped: false,
        error: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::posting;

    fn job(title: &str, description: &str) -> JobPosting {
        let mut job = posting("https://x.com/1", "data analyst");
        job.title = title.into();
        job.description = description.into();
        job
    }

    fn terms() -> Vec<String> {
        vec!["data analyst".into(), "product manager".into()]
    }

    #[test]
    fn test_ideal_junior_role_scores_ten() {
        let eval = compute_keyword_evaluation(
            &job(
                "Junior Data Analyst",
                "0-2 years of experience with SQL. We offer H1B visa sponsorship.",
            ),
            &terms(),
        );
        assert_eq!(eval.score, 10);
        assert!(eval.keyword_match && eval.entry_level && eval.visa_sponsorship);
        assert!(!eval.requires_phd);
    }

    #[test]
    fn test_senior_title_is_not_entry_level() {
        let eval = compute_keyword_evaluation(
            &job("Senior Data Analyst", "Great team, competitive pay and benefits."),
            &terms(),
        );
        assert!(!eval.entry_level);
        assert_eq!(eval.score, 6);
    }

    #[test]
    fn test_many_years_required_is_not_entry_level() {
        let eval = compute_keyword_evaluation(
            &job("Data Analyst", "You have 5+ years of experience in analytics."),
            &terms(),
        );
        assert!(!eval.entry_level);
    }

    #[test]
    fn test_sponsorship_rejection() {
        let eval = compute_keyword_evaluation(
            &job("Data Analyst", "We are unable to sponsor visas for this position."),
            &terms(),
        );
        assert!(!eval.visa_sponsorship);
        assert_eq!(eval.score, 7);
    }

    #[test]
    fn test_required_phd_caps_score() {
        let eval = compute_keyword_evaluation(
            &job("Data Analyst", "A PhD in Statistics is required for this role."),
            &terms(),
        );
        assert!(eval.requires_phd);
        assert_eq!(eval.score, 3);
        assert!(!eval.passes_criteria());

        let optional = compute_keyword_evaluation(
            &job("Data Analyst", "Masters required, PhD preferred."),
            &terms(),
        );
        assert!(!optional.requires_phd);
    }

    #[test]
    fn test_description_only_match() {
        let eval = compute_keyword_evaluation(
            &job("Analytics Associate", "Work as a data analyst with the product team."),
            &terms(),
        );
        assert!(eval.keyword_match);
        assert_eq!(eval.score, 7);
    }

    #[test]
    fn test_no_match() {
        let eval = compute_keyword_evaluation(
            &job("Warehouse Associate", "Lift boxes and operate forklifts."),
            &terms(),
        );
        assert!(!eval.keyword_match);
        assert!(!eval.passes_criteria());
    }
}
