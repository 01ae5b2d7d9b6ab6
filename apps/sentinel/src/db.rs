use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::errors::SentinelError;

/// Opens (creating if missing) the SQLite history database and applies the schema.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, SentinelError> {
    info!("Opening SQLite history store at {database_url}");

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let file = options.clone().get_filename();
    if let Some(parent) = file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }
    }

    // One connection: the batch is sequential, and `sqlite::memory:` is per-connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;

    info!("SQLite history store ready");
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sent_jobs (
            recipient TEXT NOT NULL,
            job_key   TEXT NOT NULL,
            job_url   TEXT NOT NULL,
            title     TEXT NOT NULL,
            company   TEXT NOT NULL,
            location  TEXT NOT NULL,
            score     INTEGER NOT NULL,
            metadata  TEXT NOT NULL DEFAULT '{}',
            sent_at   TEXT NOT NULL,
            PRIMARY KEY (recipient, job_key)
        );

        CREATE INDEX IF NOT EXISTS idx_sent_jobs_sent_at ON sent_jobs(sent_at);
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_pool_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("data").join("nested").join("sentinel.db");

        let pool = create_pool(&format!("sqlite://{}", db_path.display())).await.unwrap();
        assert!(db_path.exists());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sent_jobs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_unopenable_database_is_a_database_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = create_pool(&format!("sqlite://{}/sentinel.db", blocker.display()))
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::Database(_)));
        assert_eq!(err.exit_code(), 3);

        let err = create_pool("sqlite::memory:?bogus=1").await.unwrap_err();
        assert!(matches!(err, SentinelError::Database(_)));
    }
}
