use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Job board a posting was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Indeed,
    #[serde(rename = "linkedin")]
    LinkedIn,
}

impl Site {
    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Indeed => "indeed",
            Site::LinkedIn => "linkedin",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "indeed" => Ok(Site::Indeed),
            "linkedin" => Ok(Site::LinkedIn),
            other => anyhow::bail!("Unsupported job site '{other}' (expected indeed or linkedin)"),
        }
    }
}

/// A single posting as normalized from any job board.
/// Text fields are empty strings when the board omitted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_url: String,
    pub description: String,
    pub site: Site,
    pub date_posted: Option<NaiveDate>,
    /// The search term whose query surfaced this posting.
    pub search_term: String,
    pub search_location: String,
}

impl JobPosting {
    /// Identity used for deduplication: the URL, or title/company/location when it is missing.
    pub fn job_key(&self) -> String {
        let url = self.job_url.trim();
        if !url.is_empty() {
            return url.to_string();
        }
        format!(
            "{}|{}|{}",
            self.title.trim().to_lowercase(),
            self.company.trim().to_lowercase(),
            self.location.trim().to_lowercase()
        )
    }

    pub fn display_title(&self) -> &str {
        or_unknown(&self.title, "Unknown Position")
    }

    pub fn display_company(&self) -> &str {
        or_unknown(&self.company, "Unknown Company")
    }

    pub fn display_location(&self) -> &str {
        or_unknown(&self.location, "Unknown Location")
    }
}

fn or_unknown<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Result of scoring one posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvaluation {
    /// 0 – 10
    pub score: u8,
    pub summary: String,
    pub keyword_match: bool,
    pub visa_sponsorship: bool,
    pub entry_level: bool,
    pub requires_phd: bool,
    pub reason: String,
    /// Not evaluated (e.g. no usable description).
    #[serde(default)]
    pub skipped: bool,
    /// Scoring failed; flags hold permissive defaults.
    #[serde(default)]
    pub error: bool,
}

impl JobEvaluation {
    /// Permissive evaluation used when the scorer could not produce a verdict.
    pub fn permissive(score: u8, reason: impl Into<String>) -> Self {
        Self {
            score,
            summary: String::new(),
            keyword_match: true,
            visa_sponsorship: true,
            entry_level: true,
            requires_phd: false,
            reason: reason.into(),
            skipped: false,
            error: false,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            score: 0,
            summary: String::new(),
            keyword_match: false,
            visa_sponsorship: false,
            entry_level: false,
            requires_phd: false,
            reason: reason.into(),
            skipped: true,
            error: false,
        }
    }

    /// Keyword match, entry level and no PhD requirement.
    pub fn passes_criteria(&self) -> bool {
        self.keyword_match && self.entry_level && !self.requires_phd
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredJob {
    pub job: JobPosting,
    pub evaluation: JobEvaluation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(url: &str) -> JobPosting {
        JobPosting {
            title: "Junior Rust Engineer".into(),
            company: "Acme".into(),
            location: "Remote".into(),
            job_url: url.into(),
            description: String::new(),
            site: Site::Indeed,
            date_posted: None,
            search_term: "rust".into(),
            search_location: "Remote".into(),
        }
    }

    #[test]
    fn test_job_key_prefers_trimmed_url() {
        assert_eq!(posting("  https://x.com/1 ").job_key(), "https://x.com/1");
    }

    #[test]
    fn test_job_key_falls_back_to_identity_fields() {
        assert_eq!(posting("").job_key(), "junior rust engineer|acme|remote");
    }

    #[test]
    fn test_site_parse_and_serde() {
        assert_eq!("LinkedIn".parse::<Site>().unwrap(), Site::LinkedIn);
        assert!("monster".parse::<Site>().is_err());
        assert_eq!(serde_json::to_string(&Site::LinkedIn).unwrap(), r#""linkedin""#);
    }

    #[test]
    fn test_display_fallbacks() {
        let mut job = posting("u");
        job.title = " ".into();
        job.company.clear();
        assert_eq!(job.display_title(), "Unknown Position");
        assert_eq!(job.display_company(), "Unknown Company");
        assert_eq!(job.display_location(), "Remote");
    }

    #[test]
    fn test_passes_criteria() {
        let mut eval = JobEvaluation::permissive(7, "ok");
        assert!(eval.passes_criteria());
        eval.requires_phd = true;
        assert!(!eval.passes_criteria());
        assert!(!JobEvaluation::skipped("no description").passes_criteria());
    }
}
