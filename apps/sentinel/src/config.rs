use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::models::job::Site;

const DEFAULT_SEARCH_TERMS: &[&str] = &["software engineer"];
const DEFAULT_LOCATIONS: &[&str] = &["San Francisco, CA"];
const DEFAULT_SITES: &[&str] = &["indeed", "linkedin"];
const DEFAULT_FROM: &str = "Job Hunter <onboarding@resend.dev>";

/// Which backend evaluates postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScorerKind {
    Llm,
    Keyword,
}

/// Someone who receives a digest, with their own search terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub needs_sponsorship: bool,
    pub search_terms: Vec<String>,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub recipients: Vec<Recipient>,
    pub locations: Vec<String>,
    pub sites: Vec<Site>,
    pub results_wanted: u32,
    pub hours_old: u32,
    pub min_score: u8,
    pub retention_days: u32,
    pub data_dir: PathBuf,
    pub database_url: String,
    pub scorer: ScorerKind,
    pub analyze_delay_ms: u64,
    pub anthropic_api_key: Option<String>,
    pub apify_token: Option<String>,
    pub resend_api_key: Option<String>,
    pub email_from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let recipients = parse_recipients(&lookup)?;

        let min_score: u8 = parse_number(&lookup, "MIN_SCORE", 6)?;
        if min_score > 10 {
            bail!("MIN_SCORE must be between 0 and 10, got {min_score}");
        }

        let sites = parse_list(lookup("JOB_SITES").as_deref(), DEFAULT_SITES)
            .iter()
            .map(|s| s.parse::<Site>())
            .collect::<Result<Vec<_>>>()?;

        let scorer = match lookup("SCORER").as_deref().map(str::trim) {
            None | Some("") | Some("llm") => ScorerKind::Llm,
            Some("keyword") => ScorerKind::Keyword,
            Some(other) => bail!("SCORER must be 'llm' or 'keyword', got '{other}'"),
        };

        let data_dir = PathBuf::from(non_empty(lookup("DATA_DIR")).unwrap_or_else(|| "data".into()));
        let database_url = non_empty(lookup("DATABASE_URL"))
            .unwrap_or_else(|| format!("sqlite://{}/sentinel.db", data_dir.display()));

        Ok(Config {
            recipients,
            locations: parse_list(lookup("LOCATIONS").as_deref(), DEFAULT_LOCATIONS),
            sites,
            results_wanted: parse_number(&lookup, "RESULTS_WANTED", 20)?,
            hours_old: parse_number(&lookup, "HOURS_OLD", 24)?,
            min_score,
            retention_days: parse_number(&lookup, "RETENTION_DAYS", 7)?,
            data_dir,
            database_url,
            scorer,
            analyze_delay_ms: parse_number(&lookup, "ANALYZE_DELAY_MS", 1000)?,
            anthropic_api_key: non_empty(lookup("ANTHROPIC_API_KEY")),
            apify_token: non_empty(lookup("APIFY_TOKEN")),
            resend_api_key: non_empty(lookup("RESEND_API_KEY")),
            email_from: non_empty(lookup("EMAIL_FROM")).unwrap_or_else(|| DEFAULT_FROM.to_string()),
        })
    }

    /// Unique search terms across all recipients.
    pub fn search_terms(&self) -> Vec<String> {
        all_search_terms(&self.recipients)
    }

    pub fn require_apify_token(&self) -> Result<&str> {
        require(&self.apify_token, "APIFY_TOKEN")
    }

    pub fn require_resend_api_key(&self) -> Result<&str> {
        require(&self.resend_api_key, "RESEND_API_KEY")
    }

    pub fn require_anthropic_api_key(&self) -> Result<&str> {
        require(&self.anthropic_api_key, "ANTHROPIC_API_KEY")
    }
}

fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_number<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(lookup(key)) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")),
    }
}

/// Splits a comma-separated value, trimming items and dropping empty ones.
/// Falls back to `default`, taken item for item, when the value is missing
/// or has no items.
pub fn parse_list(value: Option<&str>, default: &[&str]) -> Vec<String> {
    let items = split_terms(value.unwrap_or(""));
    if items.is_empty() {
        default.iter().map(|s| s.to_string()).collect()
    } else {
        items
    }
}

fn split_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolves recipients from `RECIPIENTS` (JSON array) or the legacy
/// `RECIPIENT_EMAIL` + `SEARCH_TERMS` pair.
pub fn parse_recipients(lookup: &impl Fn(&str) -> Option<String>) -> Result<Vec<Recipient>> {
    if let Some(raw) = non_empty(lookup("RECIPIENTS")) {
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => {
                let recipients = recipients_from_json(&value);
                if !recipients.is_empty() {
                    info!("Loaded {} recipient(s) from RECIPIENTS config", recipients.len());
                    return Ok(recipients);
                }
            }
            Err(e) => warn!("Invalid RECIPIENTS JSON: {e}"),
        }
    }

    let Some(email) = non_empty(lookup("RECIPIENT_EMAIL")) else {
        bail!(
            "No recipient configuration found. \
             Set RECIPIENTS (JSON) or RECIPIENT_EMAIL environment variable."
        );
    };

    let search_terms = parse_list(lookup("SEARCH_TERMS").as_deref(), DEFAULT_SEARCH_TERMS);
    info!("Using legacy config: {email} (needs_sponsorship=true)");

    Ok(vec![Recipient {
        email,
        needs_sponsorship: true,
        search_terms,
    }])
}

fn recipients_from_json(value: &Value) -> Vec<Recipient> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let email = entry.get("email")?.as_str()?.trim();
            if email.is_empty() {
                return None;
            }
            let needs_sponsorship = entry
                .get("needs_sponsorship")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            let search_terms = match entry.get("search_terms") {
                Some(Value::String(s)) => split_terms(s),
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };
            Some(Recipient {
                email: email.to_string(),
                needs_sponsorship,
                search_terms,
            })
        })
        .collect()
}

/// Case-insensitively unique search terms, in first-occurrence order.
pub fn all_search_terms(recipients: &[Recipient]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::new();

    for term in recipients.iter().flat_map(|r| r.search_terms.iter()) {
        let trimmed = term.trim();
        if !trimmed.is_empty() && seen.insert(trimmed.to_lowercase()) {
            unique.push(trimmed.to_string());
        }
    }

    unique
}
