//! Removal, deactivation and deletion commands.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_entity::node::NodeRef;

use super::Session;
use crate::output;

/// What a lifecycle command acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A whole AOI with its tree.
    Aoi(Uuid),
    /// One directory or file with its subtree.
    Node(NodeRef),
}

impl FromStr for Target {
    type Err = String;

    /// Parse `aoi:<uuid>`, `directory:<uuid>` or `file:<uuid>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("aoi:") {
            Some(id) => Uuid::parse_str(id)
                .map(Self::Aoi)
                .map_err(|e| format!("invalid AOI id '{id}': {e}")),
            None => s.parse().map(Self::Node),
        }
    }
}

/// Arguments for lifecycle commands
#[derive(Debug, Args)]
pub struct LifecycleArgs {
    /// Lifecycle subcommand
    #[command(subcommand)]
    pub command: LifecycleCommand,
}

/// Lifecycle subcommands
#[derive(Debug, Subcommand)]
pub enum LifecycleCommand {
    /// Soft-remove: hidden from current views, kept for history
    Remove {
        /// `aoi:<uuid>`, `directory:<uuid>` or `file:<uuid>`
        target: Target,
        /// Removal instant (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Archive a removed subtree and release its files
    Deactivate {
        /// `aoi:<uuid>`, `directory:<uuid>` or `file:<uuid>`
        target: Target,
    },
    /// Permanently delete an archived subtree
    Delete {
        /// `aoi:<uuid>`, `directory:<uuid>` or `file:<uuid>`
        target: Target,
    },
}

/// Execute lifecycle commands
pub async fn execute(args: &LifecycleArgs, session: &Session) -> Result<(), AppError> {
    let store = &session.store;
    let ctx = session.request_context();

    match &args.command {
        LifecycleCommand::Remove { target, at } => match target {
            Target::Aoi(id) => {
                let aoi = store.remove_aoi(&ctx, *id, *at).await?;
                output::print_success(&format!("AOI '{}' removed", aoi.name));
            }
            Target::Node(node) => {
                let count = store.soft_remove(&ctx, *node, *at).await?;
                output::print_success(&format!("Removed {node} ({count} records)"));
            }
        },
        LifecycleCommand::Deactivate { target } => match target {
            Target::Aoi(id) => {
                let aoi = store.deactivate_aoi(&ctx, *id).await?;
                output::print_success(&format!("AOI '{}' deactivated", aoi.name));
            }
            Target::Node(node) => {
                let count = store.deactivate(&ctx, *node).await?;
                output::print_success(&format!("Deactivated {node} ({count} records)"));
            }
        },
        LifecycleCommand::Delete { target } => {
            match target {
                Target::Aoi(id) => store.delete_aoi(&ctx, *id).await?,
                Target::Node(node) => store.hard_delete(&ctx, *node).await?,
            }
            output::print_success("Deleted");
        }
    }

    Ok(())
}
