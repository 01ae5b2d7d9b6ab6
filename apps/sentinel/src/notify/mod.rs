//! Email delivery through Resend.
//!
//! `EmailSender` renders and sends; the transport sits behind the `Mailer`
//! trait so runs can be exercised without the network.

pub mod markdown;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::job::ScoredJob;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resend API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Email transport. Returns the provider's message id.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError>;
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct ResendMailer {
    client: Client,
    api_key: String,
}

impl ResendMailer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ResendErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent: ResendResponse = response.json().await?;
        Ok(sent.id)
    }
}

/// Renders digests and hands them to a `Mailer`. Delivery failures are
/// logged and reported as `false`; they never abort a run.
#[derive(Clone)]
pub struct EmailSender {
    mailer: Arc<dyn Mailer>,
    from: String,
}

impl EmailSender {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }

    /// Sends the digest of `jobs` to `recipient`. An empty list sends nothing.
    pub async fn send_daily_digest(&self, recipient: &str, jobs: &[ScoredJob], date: NaiveDate) -> bool {
        if jobs.is_empty() {
            warn!(recipient, "No jobs to send, skipping email");
            return false;
        }

        let email = OutgoingEmail {
            from: self.from.clone(),
            to: vec![recipient.to_string()],
            subject: templates::digest_subject(jobs.len(), date),
            html: templates::render_digest(jobs, date),
        };

        info!(recipient, count = jobs.len(), "Sending digest");
        self.deliver(&email, "digest").await
    }

    pub async fn send_empty_notification(&self, recipient: &str, date: NaiveDate) -> bool {
        let email = OutgoingEmail {
            from: self.from.clone(),
            to: vec![recipient.to_string()],
            subject: templates::empty_subject(date),
            html: templates::render_empty(date),
        };

        self.deliver(&email, "empty notification").await
    }

    async fn deliver(&self, email: &OutgoingEmail, kind: &str) -> bool {
        let recipient = email.to.join(", ");
        match self.mailer.send(email).await {
            Ok(id) => {
                info!(recipient = %recipient, id = %id, "Sent {kind}");
                true
            }
            Err(e) => {
                error!(recipient = %recipient, "Failed to send {kind}: {e}");
                false
            }
        }
    }
}
