//! Snapshot export CLI command.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;

use aoistore_core::error::AppError;
use aoistore_entity::node::NodeRef;

use super::Session;
use crate::output;

/// Arguments for the export command
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// `directory:<uuid>` or `file:<uuid>`
    pub node: NodeRef,
    /// Output directory (must not contain the exported name yet)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Reconstruct the tree as of this instant (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,
    /// Enqueue a job instead of exporting in this process
    #[arg(long)]
    pub background: bool,
}

/// Execute the export command
pub async fn execute(args: &ExportArgs, session: &Session) -> Result<(), AppError> {
    if args.background {
        let handle = session
            .queue
            .enqueue_export(&session.user, args.node, args.output.clone(), args.as_of)
            .await?;
        output::print_success(&format!("Export enqueued (job: {})", handle.id()));
        return Ok(());
    }

    let Some(output_dir) = &args.output else {
        return Err(AppError::validation(
            "--output is required unless the export runs in the background",
        ));
    };

    let ctx = session.request_context();
    let report = session
        .store
        .export(&ctx, args.node, output_dir, args.as_of)
        .await?;
    output::print_success(&format!("Exported {} as of {}", args.node, report.as_of));
    output::print_item(&report, session.format);
    Ok(())
}
