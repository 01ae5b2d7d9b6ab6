// All LLM prompt constants for job scoring.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// System prompt for job evaluation.
pub fn evaluation_system() -> String {
    format!("You are a job posting analyzer for an early-career job seeker. {JSON_ONLY_SYSTEM}")
}

/// Evaluation prompt template. Replace `{title}`, `{company}`, `{location}`,
/// `{description}` and `{search_terms}` before sending.
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Analyze this job posting and answer with JSON only.

Job Title: {title}
Company: {company}
Location: {location}
Description: {description}

Target Roles: {search_terms}

Evaluate:
1. score: overall fit for an entry-level candidate targeting the roles above, integer 0-10.
2. summary: one or two sentences on what the role is and why it fits or does not.
3. keyword_match: Does the job title/description match any target roles? (true/false)
4. visa_sponsorship: Does it mention H1B, visa sponsorship, or NOT explicitly reject sponsorship? (true/false)
5. entry_level: Is this entry-level (0-3 years experience required)? Check for "entry", "junior", "associate", "new grad", or 0-3 years. (true/false)
6. requires_phd: Does it require a PhD or doctorate? (true/false)

Respond ONLY with valid JSON:
{"score": 0-10, "summary": "...", "keyword_match": true/false, "visa_sponsorship": true/false, "entry_level": true/false, "requires_phd": true/false, "reason": "brief explanation"}"#;
