use thiserror::Error;

use crate::llm_client::LlmError;
use crate::notify::MailError;
use crate::schedule::crontab::CrontabError;
use crate::scraping::apify::ApifyError;

/// Top-level error type for the sentinel binary.
/// Each variant maps to a distinct process exit code.
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Scraper error: {0}")]
    Scraper(#[from] ApifyError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Email error: {0}")]
    Mail(#[from] MailError),

    #[error("Crontab error: {0}")]
    Crontab(#[from] CrontabError),

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Aborted by user")]
    Aborted,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SentinelError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SentinelError::Config(_) => 2,
            SentinelError::Database(_) => 3,
            SentinelError::Scraper(_) | SentinelError::Llm(_) | SentinelError::Mail(_) => 4,
            SentinelError::Crontab(_) => 5,
            SentinelError::Io(_) | SentinelError::Serialization(_) => 6,
            SentinelError::Aborted => 130,
            SentinelError::Internal(_) => 1,
        }
    }
}

impl From<serde_json::Error> for SentinelError {
    fn from(e: serde_json::Error) -> Self {
        SentinelError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for SentinelError {
    fn from(e: csv::Error) -> Self {
        SentinelError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_fatal_classes() {
        assert_eq!(SentinelError::Config("x".into()).exit_code(), 2);
        assert_eq!(
            SentinelError::Crontab(CrontabError::Write {
                code: Some(1),
                stderr: "bad".into()
            })
            .exit_code(),
            5
        );
        assert_eq!(SentinelError::Aborted.exit_code(), 130);
        assert_ne!(SentinelError::Internal(anyhow::anyhow!("x")).exit_code(), 0);
    }

    #[test]
    fn test_json_errors_become_serialization() {
        let err: SentinelError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, SentinelError::Serialization(_)));
    }
}
