//! Minimal Apify REST client: start an actor run, long-poll it, fetch its dataset.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

const BASE_URL: &str = "https://api.apify.com/v2";
/// `waitForFinish=60` per poll, so this allows roughly half an hour per run.
const MAX_POLLS: u32 = 30;

#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Actor run ended with status {0}")]
    RunFailed(String),

    #[error("Actor run {0} did not finish in time")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, ApifyError>;

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
}

/// Maps a run status to done / failed / still running.
fn run_outcome(status: &str) -> Option<Result<()>> {
    match status {
        "SUCCEEDED" => Some(Ok(())),
        "FAILED" | "ABORTED" | "TIMED-OUT" => Some(Err(ApifyError::RunFailed(status.to_string()))),
        _ => None,
    }
}

#[derive(Clone)]
pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Start an actor run with the given input. Returns immediately with run metadata.
    pub async fn start_run(&self, actor_id: &str, input: &serde_json::Value) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", BASE_URL, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let api_resp: ApiResponse<RunData> = check(resp).await?.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes, using `waitForFinish=60` long-polling.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        for _ in 0..MAX_POLLS {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", BASE_URL, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let api_resp: ApiResponse<RunData> = check(resp).await?.json().await?;
            match run_outcome(&api_resp.data.status) {
                Some(Ok(())) => return Ok(api_resp.data),
                Some(Err(e)) => return Err(e),
                None => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                }
            }
        }
        Err(ApifyError::Timeout(run_id.to_string()))
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json&clean=true", BASE_URL, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        Ok(check(resp).await?.json().await?)
    }

    /// Start, poll and fetch in one go.
    pub async fn run_actor<T: DeserializeOwned>(
        &self,
        actor_id: &str,
        input: &serde_json::Value,
    ) -> Result<Vec<T>> {
        let run = self.start_run(actor_id, input).await?;
        tracing::info!(actor_id, run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::debug!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        self.get_dataset_items(&completed.default_dataset_id).await
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApifyError::Api {
        status: status.as_u16(),
        message: body,
    })
}
