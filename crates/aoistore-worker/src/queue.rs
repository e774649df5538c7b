//! Job queue for enqueuing and claiming background jobs.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use aoistore_core::error::{AppError, ErrorKind};
use aoistore_core::result::AppResult;
use aoistore_core::traits::Clock;
use aoistore_database::repositories::JobRepository;
use aoistore_entity::aoi::GeoPoint;
use aoistore_entity::job::{CreateJob, Job, JobPayload, JobStatus};
use aoistore_entity::node::NodeRef;

use crate::handle::JobHandle;

/// Database-backed job queue.
///
/// Running jobs claimed through this queue keep a cancellation token here,
/// so an abort from the same process reaches them immediately; aborts from
/// other processes arrive through [`sync_cancellations`](Self::sync_cancellations).
#[derive(Debug, Clone)]
pub struct JobQueue {
    /// Job repository for persistence.
    repo: Arc<JobRepository>,
    /// Time source for job timestamps.
    clock: Arc<dyn Clock>,
    /// Worker identifier for claiming jobs.
    worker_id: String,
    /// Attempts allowed for new jobs.
    max_attempts: i32,
    /// Tokens of jobs running in this process.
    running: Arc<DashMap<Uuid, CancellationToken>>,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(
        repo: Arc<JobRepository>,
        clock: Arc<dyn Clock>,
        worker_id: impl Into<String>,
        max_attempts: i32,
    ) -> Self {
        Self {
            repo,
            clock,
            worker_id: worker_id.into(),
            max_attempts,
            running: Arc::new(DashMap::new()),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Enqueue a typed payload.
    pub async fn enqueue(&self, created_by: &str, payload: &JobPayload) -> AppResult<JobHandle> {
        let data = CreateJob::from_payload(payload, self.max_attempts, created_by).map_err(|e| {
            AppError::with_source(ErrorKind::Serialization, "Failed to encode job payload", e)
        })?;
        let job = self.repo.create(&data, self.clock.now()).await?;
        info!(job_id = %job.id, job_type = %job.job_type, created_by = %created_by, "Job enqueued");
        Ok(self.handle(job.id))
    }

    /// Enqueue creation of a new AOI from a bundle directory.
    #[allow(clippy::too_many_arguments)]
    pub async fn enqueue_import_aoi(
        &self,
        created_by: &str,
        name: &str,
        source_path: PathBuf,
        boundary: Option<String>,
        pourpoint: Option<GeoPoint>,
        parent_aoi_id: Option<Uuid>,
        comment: Option<String>,
    ) -> AppResult<JobHandle> {
        self.enqueue(
            created_by,
            &JobPayload::ImportAoi {
                name: name.to_string(),
                source_path: source_path.display().to_string(),
                boundary,
                pourpoint,
                parent_aoi_id,
                comment,
            },
        )
        .await
    }

    /// Enqueue creation of a node under an existing directory.
    pub async fn enqueue_import(
        &self,
        created_by: &str,
        parent_id: Uuid,
        type_tag: &str,
        source_path: PathBuf,
        name: Option<String>,
        comment: Option<String>,
    ) -> AppResult<JobHandle> {
        self.enqueue(
            created_by,
            &JobPayload::Import {
                parent_id,
                type_tag: type_tag.to_string(),
                source_path: source_path.display().to_string(),
                name,
                comment,
            },
        )
        .await
    }

    /// Enqueue an archiving-policy update of a directory.
    pub async fn enqueue_update(
        &self,
        created_by: &str,
        directory_id: Uuid,
        source_path: PathBuf,
    ) -> AppResult<JobHandle> {
        self.enqueue(
            created_by,
            &JobPayload::Update {
                directory_id,
                source_path: source_path.display().to_string(),
            },
        )
        .await
    }

    /// Enqueue a snapshot export.
    pub async fn enqueue_export(
        &self,
        created_by: &str,
        node: NodeRef,
        output_dir: Option<PathBuf>,
        as_of: Option<DateTime<Utc>>,
    ) -> AppResult<JobHandle> {
        self.enqueue(
            created_by,
            &JobPayload::Export {
                node,
                output_dir: output_dir.map(|p| p.display().to_string()),
                as_of,
            },
        )
        .await
    }

    /// Handle for an existing job.
    pub fn handle(&self, job_id: Uuid) -> JobHandle {
        JobHandle::new(job_id, self.clone())
    }

    pub async fn find(&self, job_id: Uuid) -> AppResult<Job> {
        self.repo
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Job {job_id} not found")))
    }

    /// Most recent jobs, newest first.
    pub async fn list(&self, status: Option<JobStatus>, limit: i64) -> AppResult<Vec<Job>> {
        self.repo.find_recent(status, limit).await
    }

    pub async fn count(&self, status: JobStatus) -> AppResult<i64> {
        self.repo.count_by_status(status).await
    }

    /// Claim the next pending job and register its cancellation token.
    pub async fn dequeue(&self) -> AppResult<Option<(Job, CancellationToken)>> {
        let Some(job) = self.repo.dequeue(&self.worker_id, self.clock.now()).await? else {
            return Ok(None);
        };
        let token = CancellationToken::new();
        self.running.insert(job.id, token.clone());
        debug!(job_id = %job.id, job_type = %job.job_type, "Job claimed");
        Ok(Some((job, token)))
    }

    /// Mark a job as succeeded.
    pub async fn complete(&self, job_id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()> {
        self.running.remove(&job_id);
        self.repo.complete(job_id, result, self.clock.now()).await
    }

    /// Mark a job as failed for good.
    pub async fn fail(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        self.running.remove(&job_id);
        self.repo.fail(job_id, error, self.clock.now()).await
    }

    /// Return a job to the queue after a transient failure.
    pub async fn retry(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        self.running.remove(&job_id);
        self.repo.retry(job_id, error, self.clock.now()).await
    }

    /// Record that a running job stopped on an abort request.
    pub async fn mark_aborted(&self, job_id: Uuid, message: &str) -> AppResult<()> {
        self.running.remove(&job_id);
        self.repo.mark_aborted(job_id, message, self.clock.now()).await
    }

    /// Abort a job: pending jobs end at once, running ones are signalled.
    pub async fn abort(&self, job_id: Uuid) -> AppResult<JobStatus> {
        let now = self.clock.now();
        if self.repo.abort_pending(job_id, now).await? {
            info!(job_id = %job_id, "Pending job aborted");
            return Ok(JobStatus::Aborted);
        }
        if self.repo.request_cancel(job_id, now).await? {
            if let Some(token) = self.running.get(&job_id) {
                token.cancel();
            }
            info!(job_id = %job_id, "Cancellation requested for running job");
        }
        Ok(self.find(job_id).await?.status)
    }

    /// Fires the tokens of local jobs whose abort was requested elsewhere.
    pub async fn sync_cancellations(&self) -> AppResult<usize> {
        let ids: Vec<Uuid> = self.running.iter().map(|entry| *entry.key()).collect();
        let mut fired = 0;
        for id in ids {
            let requested = self
                .repo
                .find_by_id(id)
                .await?
                .is_some_and(|job| job.cancel_requested);
            if requested {
                if let Some(token) = self.running.get(&id) {
                    if !token.is_cancelled() {
                        token.cancel();
                        fired += 1;
                    }
                }
            }
        }
        Ok(fired)
    }

    /// Requeue jobs a previous run of this worker left `running`.
    pub async fn recover(&self) -> AppResult<u64> {
        let requeued = self.repo.requeue_stale(&self.worker_id, self.clock.now()).await?;
        if requeued > 0 {
            info!(worker_id = %self.worker_id, count = requeued, "Requeued stale jobs");
        }
        Ok(requeued)
    }
}
