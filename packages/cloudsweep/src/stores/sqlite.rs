//! SQLite job store.
//!
//! A file-based durable mirror using SQLite. Good for:
//! - Local development
//! - Single-server deployments
//! - Testing with persistent data

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::JobStore;
use crate::types::job::{Job, JobStatus};

/// SQLite-backed job store.
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Create a store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite:./jobs.db?mode=rwc` - File-based, created if missing
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string().into()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub async fn in_memory() -> StoreResult<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                services TEXT NOT NULL DEFAULT '[]',
                started_at TEXT NOT NULL,
                completed_at TEXT,
                total_artifacts INTEGER NOT NULL DEFAULT 0,
                successful_artifacts INTEGER NOT NULL DEFAULT 0,
                failed_artifacts INTEGER NOT NULL DEFAULT 0,
                errors TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_started_at ON jobs(started_at);
            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string().into()))?;

        Ok(())
    }

    async fn upsert(&self, job: &Job) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO jobs
                (id, status, services, started_at, completed_at,
                 total_artifacts, successful_artifacts, failed_artifacts, errors)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.to_string())
        .bind(job.status.to_string())
        .bind(serde_json::to_string(&job.services)?)
        .bind(job.started_at.to_rfc3339())
        .bind(job.completed_at.map(|t| t.to_rfc3339()))
        .bind(job.total_artifacts as i64)
        .bind(job.successful_artifacts as i64)
        .bind(job.failed_artifacts as i64)
        .bind(serde_json::to_string(&job.errors)?)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string().into()))?;

        Ok(())
    }
}

#[derive(FromRow)]
struct JobRow {
    id: String,
    status: String,
    services: String,
    started_at: String,
    completed_at: Option<String>,
    total_artifacts: i64,
    successful_artifacts: i64,
    failed_artifacts: i64,
    errors: String,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| StoreError::Database(e.to_string().into()))?;
        let status: JobStatus = row
            .status
            .parse()
            .map_err(|e: String| StoreError::Database(e.into()))?;
        let started_at = parse_timestamp(&row.started_at)?;
        let completed_at = row
            .completed_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(Job {
            id,
            status,
            services: serde_json::from_str(&row.services)?,
            started_at,
            completed_at,
            total_artifacts: row.total_artifacts as usize,
            successful_artifacts: row.successful_artifacts as usize,
            failed_artifacts: row.failed_artifacts as usize,
            errors: serde_json::from_str(&row.errors)?,
        })
    }
}

fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(e.to_string().into()))
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create_job(&self, job: &Job) -> StoreResult<()> {
        self.upsert(job).await
    }

    async fn update_job(&self, job: &Job) -> StoreResult<()> {
        self.upsert(job).await
    }

    async fn get_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as(
            "SELECT id, status, services, started_at, completed_at, \
             total_artifacts, successful_artifacts, failed_artifacts, errors \
             FROM jobs WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string().into()))?;

        row.map(Job::try_from).transpose()
    }

    async fn list_jobs(&self, limit: usize) -> StoreResult<Vec<Job>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT id, status, services, started_at, completed_at, \
             total_artifacts, successful_artifacts, failed_artifacts, errors \
             FROM jobs ORDER BY started_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string().into()))?;

        rows.into_iter().map(Job::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let store = SqliteJobStore::in_memory().await.unwrap();
        let mut job = Job::new(vec!["ec2".to_string(), "s3".to_string()]);
        job.start();
        store.create_job(&job).await.unwrap();

        job.total_artifacts = 7;
        job.record_send(true);
        job.record_error("one delivery failed");
        job.record_send(false);
        job.complete();
        store.update_job(&job).await.unwrap();

        let stored = store.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.services, job.services);
        assert_eq!(stored.total_artifacts, 7);
        assert_eq!(stored.successful_artifacts, 1);
        assert_eq!(stored.failed_artifacts, 1);
        assert_eq!(stored.errors, vec!["one delivery failed".to_string()]);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_list_ordering_and_limit() {
        let store = SqliteJobStore::in_memory().await.unwrap();
        let older = Job::new(vec![]);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = Job::new(vec![]);

        store.create_job(&older).await.unwrap();
        store.create_job(&newer).await.unwrap();

        let listed = store.list_jobs(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);

        let limited = store.list_jobs(1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_job() {
        let store = SqliteJobStore::in_memory().await.unwrap();
        assert!(store.get_job(Uuid::new_v4()).await.unwrap().is_none());
    }
}
