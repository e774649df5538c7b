//! Handle to a queued job.

use uuid::Uuid;

use aoistore_core::result::AppResult;
use aoistore_entity::job::{Job, JobStatus};

use crate::queue::JobQueue;

/// Returned by every enqueue call.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: Uuid,
    queue: JobQueue,
}

impl JobHandle {
    pub(crate) fn new(id: Uuid, queue: JobQueue) -> Self {
        Self { id, queue }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current status.
    pub async fn status(&self) -> AppResult<JobStatus> {
        Ok(self.queue.find(self.id).await?.status)
    }

    /// The full job record, including result and error message.
    pub async fn job(&self) -> AppResult<Job> {
        self.queue.find(self.id).await
    }

    /// Cancels the job; returns the status after the request.
    pub async fn abort(&self) -> AppResult<JobStatus> {
        self.queue.abort(self.id).await
    }
}
