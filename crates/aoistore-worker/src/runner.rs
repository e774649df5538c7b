//! Worker runner: main loop that polls for jobs and executes them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::time;
use tracing::{error, info, trace, warn};
use uuid::Uuid;

use aoistore_core::config::WorkerConfig;
use aoistore_core::result::AppResult;
use aoistore_entity::job::Job;
use aoistore_service::RequestContext;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::JobQueue;

/// Polls the queue and runs jobs up to the configured concurrency.
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job queue for polling
    queue: Arc<JobQueue>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Worker configuration
    config: WorkerConfig,
}

impl WorkerRunner {
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
        }
    }

    /// Runs until `shutdown` turns true, then waits up to the grace period
    /// for in-flight jobs. Jobs still running afterwards are requeued by
    /// the next start.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let worker_id = self.queue.worker_id().to_string();
        info!(
            worker_id = %worker_id,
            concurrency = self.config.concurrency,
            poll_interval = self.config.poll_interval_seconds,
            "Worker started"
        );

        if let Err(e) = self.queue.recover().await {
            error!(worker_id = %worker_id, error = %e, "Failed to requeue stale jobs");
        }

        let concurrency = self.config.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds.max(1));

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(worker_id = %worker_id, "Worker received shutdown signal");
                        break;
                    }
                }
                _ = self.poll_and_execute(&semaphore) => {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                info!(worker_id = %worker_id, "Worker shutting down");
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        info!(worker_id = %worker_id, "Waiting for in-flight jobs to complete");
        let grace = Duration::from_secs(self.config.shutdown_grace_seconds);
        let permits = u32::try_from(concurrency).unwrap_or(u32::MAX);
        if time::timeout(grace, semaphore.acquire_many(permits)).await.is_err() {
            warn!(worker_id = %worker_id, "Grace period elapsed with jobs still running");
        }
        info!(worker_id = %worker_id, "Worker shut down complete");
    }

    /// Claims one job and runs it to completion on the current task.
    /// Returns the id of the processed job, if any was pending.
    pub async fn process_next(&self) -> AppResult<Option<Uuid>> {
        let Some((job, token)) = self.queue.dequeue().await? else {
            return Ok(None);
        };
        let job_id = job.id;
        let ctx = RequestContext::new(job.created_by.clone()).with_cancellation(token);
        let outcome = self.executor.execute(&job, &ctx).await;
        settle(&self.queue, &job, outcome).await;
        Ok(Some(job_id))
    }

    async fn poll_and_execute(&self, semaphore: &Arc<Semaphore>) {
        if let Err(e) = self.queue.sync_cancellations().await {
            warn!(error = %e, "Failed to sync cancellation requests");
        }

        let Ok(permit) = semaphore.clone().try_acquire_owned() else {
            trace!("All worker slots occupied, waiting");
            return;
        };

        match self.queue.dequeue().await {
            Ok(Some((job, token))) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);
                tokio::spawn(async move {
                    let _permit = permit;
                    let ctx = RequestContext::new(job.created_by.clone()).with_cancellation(token);
                    let outcome = executor.execute(&job, &ctx).await;
                    settle(&queue, &job, outcome).await;
                });
            }
            Ok(None) => trace!("No jobs available"),
            Err(e) => error!(error = %e, "Failed to dequeue job"),
        }
    }
}

/// Records the outcome of one execution.
async fn settle(
    queue: &JobQueue,
    job: &Job,
    outcome: Result<Option<serde_json::Value>, JobExecutionError>,
) {
    let job_id = job.id;
    let recorded = match outcome {
        Ok(result) => {
            info!(job_id = %job_id, job_type = %job.job_type, "Job completed successfully");
            queue.complete(job_id, result.as_ref()).await
        }
        Err(JobExecutionError::Transient(msg)) if job.can_retry() => {
            warn!(
                job_id = %job_id,
                attempt = job.attempts,
                max_attempts = job.max_attempts,
                error = %msg,
                "Job failed, will retry"
            );
            queue.retry(job_id, &msg).await
        }
        Err(JobExecutionError::Transient(msg)) | Err(JobExecutionError::Permanent(msg)) => {
            error!(job_id = %job_id, error = %msg, "Job failed");
            queue.fail(job_id, &msg).await
        }
        Err(JobExecutionError::Internal(err)) => {
            let msg = err.to_string();
            error!(job_id = %job_id, error = %msg, "Job internal error");
            queue.fail(job_id, &msg).await
        }
        Err(JobExecutionError::Cancelled(msg)) => {
            info!(job_id = %job_id, "Job aborted");
            queue.mark_aborted(job_id, &msg).await
        }
    };
    if let Err(e) = recorded {
        error!(job_id = %job_id, error = %e, "Failed to record job outcome");
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use async_trait::async_trait;
    use serde_json::Value;

    use aoistore_core::config::AppConfig;
    use aoistore_core::traits::{Clock, ManualClock};
    use aoistore_database::repositories::JobRepository;
    use aoistore_database::DatabasePool;
    use aoistore_entity::job::JobStatus;
    use aoistore_entity::node::NodeRef;
    use aoistore_service::registry::layout;
    use aoistore_service::ContentStore;

    use super::*;
    use crate::executor::JobHandler;
    use crate::jobs::default_executor;

    struct Harness {
        _dir: tempfile::TempDir,
        root: PathBuf,
        store: Arc<ContentStore>,
        queue: Arc<JobQueue>,
    }

    impl Harness {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().to_path_buf();
            let config = AppConfig::for_data_root(root.join("data").display().to_string());
            tokio::fs::create_dir_all(root.join("data")).await.unwrap();
            let db = DatabasePool::connect_and_migrate(&config.database).await.unwrap();
            let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_seconds(100));
            let store = Arc::new(
                ContentStore::open(&config, db.pool().clone(), clock.clone())
                    .await
                    .unwrap(),
            );
            let repo = Arc::new(JobRepository::new(db.pool().clone()));
            let queue = Arc::new(JobQueue::new(repo, clock, "worker-test", 2));
            Self {
                _dir: dir,
                root,
                store,
                queue,
            }
        }

        fn runner(&self, executor: JobExecutor) -> WorkerRunner {
            WorkerRunner::new(self.queue.clone(), Arc::new(executor), WorkerConfig::default())
        }

        async fn bundle(&self, name: &str) -> PathBuf {
            let root = self.root.join("sources").join(name);
            let mut entries: Vec<String> = Vec::new();
            for vector in layout::AOI_REQUIRED_VECTORS {
                entries.push(format!("aoi.gdb/{vector}.shp"));
            }
            for raster in layout::AOI_REQUIRED_RASTERS.iter().chain(&["aoi"]) {
                entries.push(format!("aoi.gdb/{raster}.img"));
            }
            for raster in layout::SURFACES_REQUIRED_RASTERS {
                entries.push(format!("surfaces.gdb/{raster}.img"));
            }
            for raster in layout::PRISM_REQUIRED_RASTERS {
                entries.push(format!("prism.gdb/{raster}.img"));
            }
            entries.push("layers.gdb/roads.shp".to_string());
            entries.push("analysis.gdb/elevzone.img".to_string());
            for rel in entries {
                let path = root.join(&rel);
                tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
                tokio::fs::write(&path, rel.as_bytes()).await.unwrap();
            }
            root
        }
    }

    /// Fails transiently on every attempt.
    #[derive(Debug)]
    struct FlakyHandler;

    #[async_trait]
    impl JobHandler for FlakyHandler {
        fn job_type(&self) -> &str {
            "export"
        }

        async fn execute(&self, _job: &Job, _ctx: &RequestContext) -> Result<Option<Value>, JobExecutionError> {
            Err(JobExecutionError::Transient("database is locked".to_string()))
        }
    }

    /// Runs until its job is aborted.
    #[derive(Debug)]
    struct WaitForAbortHandler;

    #[async_trait]
    impl JobHandler for WaitForAbortHandler {
        fn job_type(&self) -> &str {
            "export"
        }

        async fn execute(&self, _job: &Job, ctx: &RequestContext) -> Result<Option<Value>, JobExecutionError> {
            ctx.cancellation().cancelled().await;
            ctx.checkpoint()?;
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_import_then_export_through_jobs() {
        let h = Harness::new().await;
        let runner = h.runner(default_executor(h.store.clone()));
        let source = h.bundle("Basin1").await;

        let import = h
            .queue
            .enqueue_import_aoi("tester", "Basin1", source, None, None, None, None)
            .await
            .unwrap();
        assert_eq!(import.status().await.unwrap(), JobStatus::Pending);
        assert_eq!(runner.process_next().await.unwrap(), Some(import.id()));

        let job = import.job().await.unwrap();
        assert_eq!(job.status, JobStatus::Succeeded, "{:?}", job.error_message);
        let result = job.result.unwrap();
        assert_eq!(result["name"], "Basin1");
        let root_id: Uuid = serde_json::from_value(result["root_id"].clone()).unwrap();

        let out = h.root.join("out");
        let export = h
            .queue
            .enqueue_export("tester", NodeRef::directory(root_id), Some(out.clone()), None)
            .await
            .unwrap();
        runner.process_next().await.unwrap();

        let job = export.job().await.unwrap();
        assert_eq!(job.status, JobStatus::Succeeded, "{:?}", job.error_message);
        let report = job.result.unwrap();
        assert!(report["files"].as_u64().unwrap() > 0);
        let path: PathBuf = serde_json::from_value(report["path"].clone()).unwrap();
        assert!(Path::new(&path).starts_with(&out));
        assert!(tokio::fs::metadata(&path).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_node_fails_without_retry() {
        let h = Harness::new().await;
        let runner = h.runner(default_executor(h.store.clone()));

        let handle = h
            .queue
            .enqueue_export("tester", NodeRef::file(Uuid::new_v4()), None, None)
            .await
            .unwrap();
        runner.process_next().await.unwrap();

        let job = handle.job().await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 1);
        assert!(job.error_message.is_some());
        assert_eq!(runner.process_next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transient_failure_retries_until_attempts_run_out() {
        let h = Harness::new().await;
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(FlakyHandler));
        let runner = h.runner(executor);

        let handle = h
            .queue
            .enqueue_export("tester", NodeRef::file(Uuid::new_v4()), None, None)
            .await
            .unwrap();

        runner.process_next().await.unwrap();
        assert_eq!(handle.status().await.unwrap(), JobStatus::Pending);

        runner.process_next().await.unwrap();
        let job = handle.job().await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 2);
    }

    #[tokio::test]
    async fn test_abort_pending_job() {
        let h = Harness::new().await;
        let runner = h.runner(default_executor(h.store.clone()));

        let handle = h
            .queue
            .enqueue_export("tester", NodeRef::file(Uuid::new_v4()), None, None)
            .await
            .unwrap();
        assert_eq!(handle.abort().await.unwrap(), JobStatus::Aborted);
        assert_eq!(runner.process_next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_abort_running_job() {
        let h = Harness::new().await;
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(WaitForAbortHandler));
        let runner = Arc::new(h.runner(executor));

        let handle = h
            .queue
            .enqueue_export("tester", NodeRef::file(Uuid::new_v4()), None, None)
            .await
            .unwrap();

        let task = tokio::spawn({
            let runner = runner.clone();
            async move { runner.process_next().await }
        });
        while handle.status().await.unwrap() != JobStatus::Running {
            tokio::task::yield_now().await;
        }

        handle.abort().await.unwrap();
        task.await.unwrap().unwrap();

        let job = handle.job().await.unwrap();
        assert_eq!(job.status, JobStatus::Aborted);
        assert!(job.cancel_requested);
    }

    #[tokio::test]
    async fn test_abort_from_another_queue_reaches_running_job() {
        let h = Harness::new().await;
        let (job, token) = {
            h.queue
                .enqueue_export("tester", NodeRef::file(Uuid::new_v4()), None, None)
                .await
                .unwrap();
            h.queue.dequeue().await.unwrap().unwrap()
        };

        let repo = Arc::new(JobRepository::new(h.store.pool.clone()));
        let other = JobQueue::new(repo, h.store.clock.clone(), "other", 2);
        assert_eq!(other.abort(job.id).await.unwrap(), JobStatus::Running);
        assert!(!token.is_cancelled());

        assert_eq!(h.queue.sync_cancellations().await.unwrap(), 1);
        assert!(token.is_cancelled());
    }
}
