//! AOI management CLI commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_entity::aoi::{Aoi, GeoPoint};
use aoistore_entity::node::NodeLifecycle;
use aoistore_service::{CreateAoiRequest, DirectorySource};

use super::Session;
use crate::output;

/// Arguments for AOI commands
#[derive(Debug, Args)]
pub struct AoiArgs {
    /// AOI subcommand
    #[command(subcommand)]
    pub command: AoiCommand,
}

/// AOI subcommands
#[derive(Debug, Subcommand)]
pub enum AoiCommand {
    /// Import an unpacked AOI bundle as a new AOI
    Create {
        /// Display name, unique among current AOIs
        #[arg(short, long)]
        name: String,
        /// Bundle directory containing aoi.gdb, surfaces.gdb, prism.gdb, ...
        #[arg(short, long)]
        source: PathBuf,
        /// Boundary geometry (stored as given)
        #[arg(long)]
        boundary: Option<String>,
        /// Outlet longitude, matched against stored pour points
        #[arg(long, requires = "latitude")]
        longitude: Option<f64>,
        /// Outlet latitude
        #[arg(long, requires = "longitude")]
        latitude: Option<f64>,
        /// Enclosing AOI
        #[arg(long)]
        parent: Option<Uuid>,
        /// Free-form comment
        #[arg(long)]
        comment: Option<String>,
        /// Enqueue a job instead of importing in this process
        #[arg(long)]
        background: bool,
    },
    /// List AOIs
    List,
    /// Show one AOI with its root directory and child AOIs
    Show {
        /// AOI id
        id: Uuid,
    },
}

/// AOI display row
#[derive(Debug, Serialize, Tabled)]
pub struct AoiRow {
    /// AOI id
    id: String,
    /// Name
    name: String,
    /// Short name
    shortname: String,
    /// Lifecycle state
    state: String,
    /// Parent AOI
    parent: String,
    /// Created at
    created_at: String,
    /// Removed at
    removed_at: String,
}

impl From<&Aoi> for AoiRow {
    fn from(aoi: &Aoi) -> Self {
        Self {
            id: aoi.id.to_string(),
            name: aoi.name.clone(),
            shortname: aoi.shortname.clone(),
            state: aoi.state().to_string(),
            parent: aoi
                .parent_aoi_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            created_at: output::timestamp(Some(aoi.created_at)),
            removed_at: output::timestamp(aoi.removed_at),
        }
    }
}

/// Execute AOI commands
pub async fn execute(args: &AoiArgs, session: &Session) -> Result<(), AppError> {
    let store = &session.store;

    match &args.command {
        AoiCommand::Create {
            name,
            source,
            boundary,
            longitude,
            latitude,
            parent,
            comment,
            background,
        } => {
            let pourpoint = longitude
                .zip(*latitude)
                .map(|(longitude, latitude)| GeoPoint {
                    longitude,
                    latitude,
                });

            if *background {
                let handle = session
                    .queue
                    .enqueue_import_aoi(
                        &session.user,
                        name,
                        source.clone(),
                        boundary.clone(),
                        pourpoint,
                        *parent,
                        comment.clone(),
                    )
                    .await?;
                output::print_success(&format!("AOI import enqueued (job: {})", handle.id()));
                return Ok(());
            }

            let ctx = session.request_context();
            let aoi = store
                .create_aoi(
                    &ctx,
                    CreateAoiRequest {
                        name: name.clone(),
                        source: DirectorySource::shared(source).await?,
                        boundary: boundary.clone(),
                        pourpoint,
                        parent_aoi_id: *parent,
                        comment: comment.clone(),
                    },
                )
                .await?;
            let root = store.aois.root_directory(aoi.id).await?;
            output::print_success(&format!("AOI '{}' created (id: {})", aoi.name, aoi.id));
            output::print_kv("Root directory", &root.id.to_string());
            output::print_kv("URL", &store.urls.resolve_aoi(aoi.id));
        }
        AoiCommand::List => {
            let rows: Vec<AoiRow> = store.aois().await?.iter().map(AoiRow::from).collect();
            output::print_list(&rows, session.format);
        }
        AoiCommand::Show { id } => {
            let aoi = store.aoi(*id).await?;
            output::print_item(&aoi, session.format);
            if session.format == output::OutputFormat::Table {
                let root = store.aois.root_directory(aoi.id).await?;
                output::print_kv("root_directory", &root.id.to_string());
                output::print_kv("url", &store.urls.resolve_aoi(aoi.id));
                let children: Vec<AoiRow> =
                    store.child_aois(aoi.id).await?.iter().map(AoiRow::from).collect();
                if !children.is_empty() {
                    println!("Child AOIs:");
                    output::print_list(&children, session.format);
                }
            }
        }
    }

    Ok(())
}
