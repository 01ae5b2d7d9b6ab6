//! Claude-backed job scorer and tolerant response parsing.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::SentinelError;
use crate::llm_client::{extract_json_object, LlmClient};
use crate::models::job::{JobEvaluation, JobPosting};
use crate::scoring::prompts::{evaluation_system, EVALUATION_PROMPT_TEMPLATE};
use crate::scoring::JobScorer;

/// Description length used when the full prompt overflows the context window.
const TRUNCATED_DESCRIPTION_CHARS: usize = 1500;

pub struct LlmJobScorer {
    llm: LlmClient,
    /// Score assigned when a response carries no usable score.
    default_score: u8,
}

impl LlmJobScorer {
    pub fn new(llm: LlmClient, default_score: u8) -> Self {
        Self { llm, default_score }
    }
}

#[async_trait]
impl JobScorer for LlmJobScorer {
    fn backend(&self) -> &'static str {
        "llm"
    }

    async fn evaluate(
        &self,
        job: &JobPosting,
        search_terms: &[String],
    ) -> Result<JobEvaluation, SentinelError> {
        let system = evaluation_system();
        let prompt = build_prompt(job, &job.description, search_terms);
        debug!(
            title = %job.display_title(),
            prompt_chars = prompt.len(),
            "Evaluating posting"
        );

        let text = match self.llm.call_text(&prompt, &system).await {
            Ok(text) => text,
            Err(e) if e.is_prompt_too_long()
                && job.description.chars().count() > TRUNCATED_DESCRIPTION_CHARS =>
            {
                warn!(title = %job.display_title(), "Prompt too long, retrying with truncated description");
                let truncated = truncate_description(&job.description);
                let prompt = build_prompt(job, &truncated, search_terms);
                self.llm.call_text(&prompt, &system).await?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(parse_evaluation(&text, self.default_score))
    }
}

fn build_prompt(job: &JobPosting, description: &str, search_terms: &[String]) -> String {
    EVALUATION_PROMPT_TEMPLATE
        .replace("{title}", job.display_title())
        .replace("{company}", job.display_company())
        .replace("{location}", job.display_location())
        .replace("{search_terms}", &search_terms.join(", "))
        // Description last so braces inside it are never treated as placeholders.
        .replace("{description}", description)
}

fn truncate_description(description: &str) -> String {
    let mut truncated: String = description.chars().take(TRUNCATED_DESCRIPTION_CHARS).collect();
    truncated.push_str("...");
    truncated
}

/// Parses a model response into an evaluation.
///
/// - JSON object found → fields read with permissive defaults
/// - no JSON object → substring heuristics over the raw text
/// - malformed JSON → permissive pass
pub fn parse_evaluation(text: &str, default_score: u8) -> JobEvaluation {
    let Some(json_str) = extract_json_object(text) else {
        return parse_from_text(text, default_score);
    };

    let value: Value = match serde_json::from_str(json_str) {
        Ok(v) => v,
        Err(_) => {
            return JobEvaluation::permissive(default_score, "JSON parse error - defaulting to pass")
        }
    };

    let flag = |key: &str, default: bool| value.get(key).and_then(Value::as_bool).unwrap_or(default);
    let text_field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    JobEvaluation {
        score: value
            .get("score")
            .and_then(score_from_value)
            .unwrap_or(default_score),
        summary: text_field("summary"),
        keyword_match: flag("keyword_match", true),
        visa_sponsorship: flag("visa_sponsorship", true),
        entry_level: flag("entry_level", true),
        requires_phd: flag("requires_phd", false),
        reason: text_field("reason"),
        skipped: false,
        error: false,
    }
}

fn score_from_value(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(raw.round().clamp(0.0, 10.0) as u8)
}

fn parse_from_text(text: &str, default_score: u8) -> JobEvaluation {
    let lower = text.to_lowercase();
    let says_true = |key: &str| {
        lower.contains(&format!("{key}\": true")) || lower.contains(&format!("{key}\":true"))
    };

    let score = Regex::new(r#"score"?\s*[:=]\s*(\d{1,2})"#)
        .ok()
        .and_then(|re| re.captures(&lower))
        .and_then(|c| c[1].parse::<u8>().ok())
        .map(|s| s.min(10))
        .unwrap_or(default_score);

    JobEvaluation {
        score,
        summary: String::new(),
        keyword_match: says_true("keyword_match"),
        visa_sponsorship: says_true("visa_sponsorship") || !lower.contains("no sponsor"),
        entry_level: says_true("entry_level"),
        requires_phd: says_true("requires_phd"),
        reason: "Parsed from text response".to_string(),
        skipped: false,
        error: false,
    }
}
