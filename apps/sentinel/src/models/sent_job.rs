use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SentJobRow {
    pub recipient: String,
    pub job_key: String,
    pub job_url: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub score: i64,
    /// JSON text: `{"summary": ..., "site": ...}`
    pub metadata: String,
    pub sent_at: DateTime<Utc>,
}
