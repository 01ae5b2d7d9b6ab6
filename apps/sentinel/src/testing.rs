//! Shared fixtures and in-process fakes for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::SentinelError;
use crate::models::job::{JobEvaluation, JobPosting, ScoredJob, Site};
use crate::notify::{MailError, Mailer, OutgoingEmail};
use crate::schedule::crontab::{CrontabBackend, CrontabError};
use crate::scoring::JobScorer;
use crate::scraping::{JobSource, SearchQuery};

pub fn posting(url: &str, term: &str) -> JobPosting {
    JobPosting {
        title: "Junior Rust Engineer".into(),
        company: "Acme".into(),
        location: "Remote".into(),
        job_url: url.into(),
        description: String::new(),
        site: Site::Indeed,
        date_posted: None,
        search_term: term.into(),
        search_location: "Remote".into(),
    }
}

/// A posting that passes every criterion, sponsorship included.
pub fn scored(url: &str, term: &str, score: u8) -> ScoredJob {
    ScoredJob {
        job: posting(url, term),
        evaluation: JobEvaluation::permissive(score, "fixture"),
    }
}

/// Returns canned postings per search term.
#[derive(Default)]
pub struct FakeSource {
    results: HashMap<String, Vec<JobPosting>>,
    failing: HashSet<String>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, term: &str, jobs: Vec<JobPosting>) -> Self {
        self.results.insert(term.to_string(), jobs);
        self
    }

    pub fn failing(mut self, term: &str) -> Self {
        self.failing.insert(term.to_string());
        self
    }
}

#[async_trait]
impl JobSource for FakeSource {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<JobPosting>, SentinelError> {
        if self.failing.contains(&query.term) {
            return Err(SentinelError::Internal(anyhow::anyhow!("board unavailable")));
        }
        Ok(self.results.get(&query.term).cloned().unwrap_or_default())
    }
}

pub struct FailingScorer;

#[async_trait]
impl JobScorer for FailingScorer {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn evaluate(&self, _job: &JobPosting, _terms: &[String]) -> Result<JobEvaluation, SentinelError> {
        Err(SentinelError::Internal(anyhow::anyhow!("model overloaded")))
    }
}

/// Records every email; optionally rejects some or all recipients.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    reject_all: bool,
    rejected: HashSet<String>,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            reject_all: true,
            ..Self::default()
        }
    }

    pub fn rejecting(recipient: &str) -> Self {
        Self {
            rejected: HashSet::from([recipient.to_string()]),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        if self.reject_all || email.to.iter().any(|to| self.rejected.contains(to)) {
            return Err(MailError::Api {
                status: 422,
                message: "rejected".into(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(format!("msg-{}", sent.len()))
    }
}

/// Crontab held in memory.
#[derive(Default)]
pub struct MemoryCrontab {
    contents: Mutex<Option<String>>,
    writes: Mutex<usize>,
    fail_writes: bool,
}

impl MemoryCrontab {
    pub fn with(contents: &str) -> Self {
        Self {
            contents: Mutex::new(Some(contents.to_string())),
            ..Self::default()
        }
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl CrontabBackend for MemoryCrontab {
    fn read(&self) -> Result<Option<String>, CrontabError> {
        Ok(self.contents())
    }

    fn write(&self, contents: &str) -> Result<(), CrontabError> {
        if self.fail_writes {
            return Err(CrontabError::Write {
                code: Some(1),
                stderr: "crontab: installing new crontab failed".into(),
            });
        }
        *self.writes.lock().unwrap() += 1;
        *self.contents.lock().unwrap() = Some(contents.to_string());
        Ok(())
    }
}
