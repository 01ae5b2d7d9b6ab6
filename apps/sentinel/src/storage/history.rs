//! Sent-job history — which postings each recipient has already received.
//!
//! Append-mostly: rows are inserted once per (recipient, job_key) and never updated.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::SentinelError;
use crate::models::job::ScoredJob;
use crate::models::sent_job::SentJobRow;

#[derive(Clone)]
pub struct JobHistory {
    pool: SqlitePool,
}

impl JobHistory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn is_sent(&self, recipient: &str, job_key: &str) -> Result<bool, SentinelError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM sent_jobs WHERE recipient = ? AND job_key = ?")
                .bind(recipient)
                .bind(job_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Drops postings this recipient already received, and repeats within `jobs`.
    /// Order is preserved.
    pub async fn filter_new_jobs(
        &self,
        recipient: &str,
        jobs: Vec<ScoredJob>,
    ) -> Result<Vec<ScoredJob>, SentinelError> {
        let total = jobs.len();
        let mut seen = HashSet::new();
        let mut fresh = Vec::new();

        for job in jobs {
            let key = job.job.job_key();
            if !seen.insert(key.clone()) {
                continue;
            }
            if !self.is_sent(recipient, &key).await? {
                fresh.push(job);
            }
        }

        info!(
            recipient,
            total,
            new = fresh.len(),
            duplicates = total - fresh.len(),
            "Checked sent-job history"
        );
        Ok(fresh)
    }

    /// Records that `job` was emailed to `recipient`. Re-marking is a no-op.
    pub async fn mark_as_sent(
        &self,
        recipient: &str,
        job: &ScoredJob,
        sent_at: DateTime<Utc>,
    ) -> Result<(), SentinelError> {
        let metadata = json!({
            "summary": job.evaluation.summary,
            "site": job.job.site,
            "search_term": job.job.search_term,
        });

        sqlx::query(
            r#"
            INSERT INTO sent_jobs
                (recipient, job_key, job_url, title, company, location, score, metadata, sent_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (recipient, job_key) DO NOTHING
            "#,
        )
        .bind(recipient)
        .bind(job.job.job_key())
        .bind(&job.job.job_url)
        .bind(&job.job.title)
        .bind(&job.job.company)
        .bind(&job.job.location)
        .bind(i64::from(job.evaluation.score))
        .bind(metadata.to_string())
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn sent_count(&self) -> Result<i64, SentinelError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM sent_jobs")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Most recently sent rows, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<SentJobRow>, SentinelError> {
        Ok(sqlx::query_as::<_, SentJobRow>(
            "SELECT * FROM sent_jobs ORDER BY sent_at DESC, job_key ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Deletes history older than `cutoff`; those postings may be sent again.
    pub async fn purge_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SentinelError> {
        let result = sqlx::query("DELETE FROM sent_jobs WHERE sent_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use crate::testing::scored;
    use chrono::{Duration, TimeZone};

    async fn history() -> JobHistory {
        JobHistory::new(create_pool("sqlite::memory:").await.unwrap())
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_filter_new_jobs_excludes_sent_per_recipient() {
        let history = history().await;
        let a = scored("https://x.com/a", "rust", 8);
        let b = scored("https://x.com/b", "rust", 7);

        history.mark_as_sent("me@x.com", &a, at(15)).await.unwrap();

        let fresh = history
            .filter_new_jobs("me@x.com", vec![a.clone(), b.clone()])
            .await
            .unwrap();
        assert_eq!(fresh, vec![b.clone()]);

        // Another recipient still gets both.
        let other = history
            .filter_new_jobs("you@x.com", vec![a, b])
            .await
            .unwrap();
        assert_eq!(other.len(), 2);
    }

    #[tokio::test]
    async fn test_filter_new_jobs_dedupes_within_input() {
        let history = history().await;
        let a = scored("https://x.com/a", "rust", 8);
        let fresh = history
            .filter_new_jobs("me@x.com", vec![a.clone(), a])
            .await
            .unwrap();
        assert_eq!(fresh.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_as_sent_is_idempotent() {
        let history = history().await;
        let a = scored("https://x.com/a", "rust", 8);
        history.mark_as_sent("me@x.com", &a, at(15)).await.unwrap();
        history.mark_as_sent("me@x.com", &a, at(16)).await.unwrap();

        assert_eq!(history.sent_count().await.unwrap(), 1);
        let rows = history.recent(10).await.unwrap();
        assert_eq!(rows[0].sent_at, at(15));
        assert_eq!(rows[0].score, 8);
        assert!(rows[0].metadata.contains("\"site\":\"indeed\""));
    }

    #[tokio::test]
    async fn test_purge_sent_before() {
        let history = history().await;
        history
            .mark_as_sent("me@x.com", &scored("https://x.com/old", "rust", 8), at(1))
            .await
            .unwrap();
        history
            .mark_as_sent("me@x.com", &scored("https://x.com/new", "rust", 8), at(15))
            .await
            .unwrap();

        let purged = history.purge_sent_before(at(15) - Duration::days(7)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(!history.is_sent("me@x.com", "https://x.com/old").await.unwrap());
        assert!(history.is_sent("me@x.com", "https://x.com/new").await.unwrap());
    }
}
