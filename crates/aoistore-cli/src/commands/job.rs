//! Background job CLI commands.

use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_entity::job::{Job, JobStatus};

use super::Session;
use crate::output;

/// Arguments for job commands
#[derive(Debug, Args)]
pub struct JobArgs {
    /// Job subcommand
    #[command(subcommand)]
    pub command: JobCommand,
}

/// Status filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl From<StatusFilter> for JobStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Pending => Self::Pending,
            StatusFilter::Running => Self::Running,
            StatusFilter::Succeeded => Self::Succeeded,
            StatusFilter::Failed => Self::Failed,
            StatusFilter::Aborted => Self::Aborted,
        }
    }
}

/// Job subcommands
#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// List recent jobs
    List {
        /// Only jobs in this status
        #[arg(short, long, value_enum)]
        status: Option<StatusFilter>,
        /// Max rows
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
    /// Show one job with its result or error
    Status {
        /// Job id
        id: Uuid,
    },
    /// Abort a pending or running job
    Abort {
        /// Job id
        id: Uuid,
    },
}

/// Job display row
#[derive(Debug, Serialize, Tabled)]
pub struct JobRow {
    /// Job id
    id: String,
    /// Type
    job_type: String,
    /// Status
    status: String,
    /// Attempts so far
    attempts: String,
    /// Created by
    created_by: String,
    /// Created at
    created_at: String,
    /// Last error
    error: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            job_type: job.job_type.clone(),
            status: job.status.to_string(),
            attempts: format!("{}/{}", job.attempts, job.max_attempts),
            created_by: job.created_by.clone(),
            created_at: output::timestamp(Some(job.created_at)),
            error: job.error_message.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Execute job commands
pub async fn execute(args: &JobArgs, session: &Session) -> Result<(), AppError> {
    match &args.command {
        JobCommand::List { status, limit } => {
            let jobs = session
                .queue
                .list(status.map(JobStatus::from), *limit)
                .await?;
            let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
            output::print_list(&rows, session.format);
        }
        JobCommand::Status { id } => {
            let job = session.queue.handle(*id).job().await?;
            output::print_item(&job, session.format);
        }
        JobCommand::Abort { id } => {
            let status = session.queue.handle(*id).abort().await?;
            if status.is_terminal() {
                output::print_success(&format!("Job {id} is {status}"));
            } else {
                output::print_success(&format!(
                    "Abort requested; job {id} stops at its next checkpoint"
                ));
            }
        }
    }

    Ok(())
}
