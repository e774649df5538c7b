//! Directory and file CLI commands.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_entity::directory::Directory;
use aoistore_entity::file::{File, FileData};
use aoistore_entity::node::{NodeLifecycle, NodeRef};
use aoistore_service::{AppendOutcome, ContentInput, DirectorySource, Node, SourceLayer};

use super::Session;
use crate::output;

/// Arguments for node commands
#[derive(Debug, Args)]
pub struct NodeArgs {
    /// Node subcommand
    #[command(subcommand)]
    pub command: NodeCommand,
}

/// Node subcommands
#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// Create a node of a variant under an existing directory
    Create {
        /// Parent directory id
        #[arg(short, long)]
        parent: Uuid,
        /// Variant tag, e.g. `Layers`, `Raster`, `Shapefile`
        #[arg(short = 't', long = "type")]
        type_tag: String,
        /// File or directory to import
        #[arg(short, long)]
        source: PathBuf,
        /// Name override
        #[arg(short, long)]
        name: Option<String>,
        /// Free-form comment
        #[arg(long)]
        comment: Option<String>,
        /// Enqueue a job instead of importing in this process
        #[arg(long)]
        background: bool,
    },
    /// Apply a directory's archiving rule to new content
    Update {
        /// Directory id
        directory: Uuid,
        /// Directory holding the new content
        #[arg(short, long)]
        source: PathBuf,
        /// Enqueue a job instead of updating in this process
        #[arg(long)]
        background: bool,
    },
    /// Offer new content for an existing file
    Append {
        /// File id
        file: Uuid,
        /// New content
        #[arg(short, long)]
        source: PathBuf,
        /// Free-form comment
        #[arg(long)]
        comment: Option<String>,
    },
    /// Show a node and its URL
    Show {
        /// `directory:<uuid>` or `file:<uuid>`
        node: NodeRef,
    },
    /// List the children of a directory
    Children {
        /// Directory id
        directory: Uuid,
        /// Historical view (RFC 3339)
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
    },
    /// List the versions of a file
    Versions {
        /// File id
        file: Uuid,
    },
}

/// Node display row
#[derive(Debug, Serialize, Tabled)]
pub struct NodeRow {
    /// Reference
    node: String,
    /// Name
    name: String,
    /// Variant
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    type_tag: String,
    /// Lifecycle state
    state: String,
    /// Created at
    created_at: String,
    /// Removed at
    removed_at: String,
}

impl From<&Directory> for NodeRow {
    fn from(dir: &Directory) -> Self {
        Self {
            node: NodeRef::directory(dir.id).to_string(),
            name: dir.name.clone(),
            type_tag: dir.type_tag.clone(),
            state: dir.state().to_string(),
            created_at: output::timestamp(Some(dir.created_at)),
            removed_at: output::timestamp(dir.removed_at),
        }
    }
}

impl From<&File> for NodeRow {
    fn from(file: &File) -> Self {
        Self {
            node: NodeRef::file(file.id).to_string(),
            name: file.name.clone(),
            type_tag: file.type_tag.clone(),
            state: file.state().to_string(),
            created_at: output::timestamp(Some(file.created_at)),
            removed_at: output::timestamp(file.removed_at),
        }
    }
}

impl From<&Node> for NodeRow {
    fn from(node: &Node) -> Self {
        match node {
            Node::Directory(d) => Self::from(d),
            Node::File(f) => Self::from(f),
        }
    }
}

/// Version display row
#[derive(Debug, Serialize, Tabled)]
pub struct VersionRow {
    /// Sequence number
    seq: i64,
    /// Version id
    id: String,
    /// SHA-256 of the content
    content_hash: String,
    /// Size in bytes
    size_bytes: i64,
    /// Created by
    created_by: String,
    /// Created at
    created_at: String,
}

impl From<&FileData> for VersionRow {
    fn from(v: &FileData) -> Self {
        Self {
            seq: v.seq,
            id: v.id.to_string(),
            content_hash: v.content_hash.clone(),
            size_bytes: v.size_bytes,
            created_by: v.created_by.clone(),
            created_at: output::timestamp(Some(v.created_at)),
        }
    }
}

/// Execute node commands
pub async fn execute(args: &NodeArgs, session: &Session) -> Result<(), AppError> {
    let store = &session.store;

    match &args.command {
        NodeCommand::Create {
            parent,
            type_tag,
            source,
            name,
            comment,
            background,
        } => {
            if *background {
                let handle = session
                    .queue
                    .enqueue_import(
                        &session.user,
                        *parent,
                        type_tag,
                        source.clone(),
                        name.clone(),
                        comment.clone(),
                    )
                    .await?;
                output::print_success(&format!("Import enqueued (job: {})", handle.id()));
                return Ok(());
            }

            let ctx = session.request_context();
            let input = ContentInput::open(source).await?;
            let node = store
                .create(&ctx, type_tag, *parent, &input, name.as_deref(), comment.as_deref())
                .await?;
            output::print_success(&format!("{} '{}' created", node.type_tag(), node.name()));
            output::print_kv("Node", &node.node_ref().to_string());
            output::print_kv("URL", &store.urls.resolve(&node)?);
        }
        NodeCommand::Update {
            directory,
            source,
            background,
        } => {
            if *background {
                let handle = session
                    .queue
                    .enqueue_update(&session.user, *directory, source.clone())
                    .await?;
                output::print_success(&format!("Update enqueued (job: {})", handle.id()));
                return Ok(());
            }

            let ctx = session.request_context();
            let outcome = store
                .update(&ctx, *directory, DirectorySource::shared(source).await?)
                .await?;
            output::print_item(&outcome, session.format);
        }
        NodeCommand::Append {
            file,
            source,
            comment,
        } => {
            let ctx = session.request_context();
            let layer = SourceLayer::from_path(source)?;
            let outcome = store
                .append_version(&ctx, *file, &layer, comment.as_deref())
                .await?;
            match &outcome {
                AppendOutcome::Added(v) => {
                    output::print_success(&format!("Version {} stored", v.seq))
                }
                AppendOutcome::Unchanged(v) => {
                    output::print_success(&format!("Content matches version {}", v.seq))
                }
            }
            output::print_list(&[VersionRow::from(outcome.version())], session.format);
        }
        NodeCommand::Show { node } => {
            let loaded = store.node(*node).await?;
            output::print_list(&[NodeRow::from(&loaded)], session.format);
            output::print_kv("URL", &store.urls.resolve(&loaded)?);
        }
        NodeCommand::Children { directory, as_of } => {
            let children = store.children(*directory, *as_of).await?;
            let rows: Vec<NodeRow> = children
                .directories
                .iter()
                .map(NodeRow::from)
                .chain(children.files.iter().map(NodeRow::from))
                .collect();
            output::print_list(&rows, session.format);
        }
        NodeCommand::Versions { file } => {
            let rows: Vec<VersionRow> = store
                .versions(*file)
                .await?
                .iter()
                .map(VersionRow::from)
                .collect();
            output::print_list(&rows, session.format);
        }
    }

    Ok(())
}
