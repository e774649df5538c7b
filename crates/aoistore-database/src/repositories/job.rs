//! Job repository implementation.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use aoistore_core::error::{AppError, ErrorKind};
use aoistore_core::result::AppResult;
use aoistore_entity::job::{CreateJob, Job, JobStatus};

/// Repository for background job CRUD and queue operations.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a job by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    /// List the most recent jobs, optionally filtered by status.
    pub async fn find_recent(&self, status: Option<JobStatus>, limit: i64) -> AppResult<Vec<Job>> {
        let jobs = match status {
            Some(status) => {
                sqlx::query_as::<_, Job>(
                    "SELECT * FROM jobs WHERE status = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(status)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY created_at DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
            }
        };
        jobs.map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))
    }

    /// Count jobs in a status.
    pub async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs WHERE status = ?")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }

    /// Claim the oldest pending job for a worker.
    ///
    /// The select and the status change happen in one statement, so two
    /// workers never claim the same job.
    pub async fn dequeue(&self, worker_id: &str, now: DateTime<Utc>) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'running', started_at = ?, worker_id = ?, \
             attempts = attempts + 1, updated_at = ? \
             WHERE id = ( \
                SELECT id FROM jobs WHERE status = 'pending' \
                ORDER BY created_at ASC LIMIT 1 \
             ) AND status = 'pending' \
             RETURNING *",
        )
        .bind(now)
        .bind(worker_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to dequeue job", e))
    }

    /// Create a new job.
    pub async fn create(&self, data: &CreateJob, now: DateTime<Utc>) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (id, job_type, payload, max_attempts, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&data.job_type)
        .bind(&data.payload)
        .bind(data.max_attempts)
        .bind(&data.created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create job", e))
    }

    /// Mark a job as succeeded.
    pub async fn complete(
        &self,
        job_id: Uuid,
        result: Option<&serde_json::Value>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'succeeded', result = ?, completed_at = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(result)
        .bind(now)
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job", e))?;
        Ok(())
    }

    /// Mark a job as failed for good.
    pub async fn fail(&self, job_id: Uuid, error_message: &str, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = ?, completed_at = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(error_message)
        .bind(now)
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job as failed", e))?;
        Ok(())
    }

    /// Put a running job back in the queue after a transient failure.
    pub async fn retry(&self, job_id: Uuid, error_message: &str, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'pending', error_message = ?, started_at = NULL, \
             worker_id = NULL, updated_at = ? \
             WHERE id = ? AND status = 'running'",
        )
        .bind(error_message)
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to retry job", e))?;
        Ok(())
    }

    /// Abort a job that has not started yet. Returns whether it was pending.
    pub async fn abort_pending(&self, job_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'aborted', cancel_requested = 1, completed_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to abort job", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Flag a running job for cancellation. Returns whether it was running.
    pub async fn request_cancel(&self, job_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET cancel_requested = 1, updated_at = ? WHERE id = ? AND status = 'running'",
        )
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to request cancellation", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Record that a running job stopped because it was cancelled.
    pub async fn mark_aborted(&self, job_id: Uuid, message: &str, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'aborted', error_message = ?, completed_at = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(message)
        .bind(now)
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job as aborted", e))?;
        Ok(())
    }

    /// Return jobs left `running` by a worker that died to the queue.
    pub async fn requeue_stale(&self, worker_id: &str, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'pending', worker_id = NULL, started_at = NULL, updated_at = ? \
             WHERE status = 'running' AND worker_id = ?",
        )
        .bind(now)
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to requeue stale jobs", e))?;
        Ok(result.rows_affected())
    }
}
