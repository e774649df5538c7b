//! AOI creation and listing.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_core::traits::Clock;
use aoistore_entity::aoi::{Aoi, CreateAoi, GeoPoint, make_short_name};
use aoistore_entity::directory::Directory;
use aoistore_entity::node::NodeStatus;

use super::matcher::GeometryMatcher;
use crate::context::RequestContext;
use crate::import::coordinator::{validate_name, ImportCoordinator};
use crate::import::source::ContentSource;
use crate::import::validation::validate_aoi_bundle;
use crate::registry::ContentInput;
use crate::tree::TreeStore;

/// Request to create an AOI from a bundle on disk.
#[derive(Debug, Clone)]
pub struct CreateAoiRequest {
    /// Display name, unique among current AOIs.
    pub name: String,
    /// Unpacked bundle.
    pub source: Arc<dyn ContentSource>,
    /// Boundary geometry, passed through untouched.
    pub boundary: Option<String>,
    /// Outlet to match against stored pour points.
    pub pourpoint: Option<GeoPoint>,
    /// Enclosing AOI.
    pub parent_aoi_id: Option<Uuid>,
    /// Free-form comment.
    pub comment: Option<String>,
}

/// AOI service: the entry point for new study areas.
#[derive(Debug, Clone)]
pub struct AoiService {
    /// Tree store.
    tree: Arc<TreeStore>,
    /// Root directory creation.
    coordinator: Arc<ImportCoordinator>,
    /// Pour point association.
    matcher: Arc<dyn GeometryMatcher>,
    /// Time source for `created_at`.
    clock: Arc<dyn Clock>,
}

impl AoiService {
    /// Creates a new AOI service.
    pub fn new(
        tree: Arc<TreeStore>,
        coordinator: Arc<ImportCoordinator>,
        matcher: Arc<dyn GeometryMatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tree,
            coordinator,
            matcher,
            clock,
        }
    }

    /// Validates the bundle, records the AOI and imports its root directory.
    ///
    /// When the import fails the AOI record is deleted again.
    pub async fn create_aoi(&self, ctx: &RequestContext, req: CreateAoiRequest) -> AppResult<Aoi> {
        ctx.checkpoint()?;
        validate_name(&req.name)?;

        if let Some(parent_id) = req.parent_aoi_id {
            self.tree.aoi(parent_id).await?;
        }
        if self.tree.aois.find_current_by_name(&req.name).await?.is_some() {
            return Err(AppError::conflict(format!(
                "An AOI named '{}' already exists",
                req.name
            )));
        }

        validate_aoi_bundle(req.source.as_ref()).await?;

        let pourpoint_id = match req.pourpoint {
            Some(point) => Some(
                self.matcher
                    .match_point(point, req.boundary.as_deref())
                    .await?
                    .id,
            ),
            None => None,
        };

        let record = CreateAoi {
            id: Uuid::new_v4(),
            shortname: make_short_name(&req.name),
            name: req.name.clone(),
            boundary: req.boundary.clone(),
            pourpoint_id,
            parent_aoi_id: req.parent_aoi_id,
            comment: req.comment.clone(),
            created_by: ctx.username.clone(),
            created_at: self.clock.now(),
        };
        let mut aoi = self.tree.aois.insert_provisional(&record).await?;
        info!(aoi_id = %aoi.id, name = %aoi.name, shortname = %aoi.shortname, "AOI record created");

        let input = ContentInput::Source(req.source.clone());
        let root = match self.coordinator.create_root(ctx, &aoi, &input).await {
            Ok(root) => root,
            Err(e) => {
                if let Err(cleanup) = self.tree.aois.delete(aoi.id).await {
                    error!(aoi_id = %aoi.id, error = %cleanup, "Rollback failed to delete AOI record");
                }
                return Err(e);
            }
        };

        self.tree.aois.finalize(aoi.id).await?;
        aoi.status = NodeStatus::Finalized;
        info!(
            user = %ctx.username,
            aoi_id = %aoi.id,
            root_id = %root.id,
            "AOI created"
        );
        Ok(aoi)
    }

    /// Every AOI, oldest first.
    pub async fn list(&self) -> AppResult<Vec<Aoi>> {
        self.tree.aois.find_all().await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Aoi> {
        self.tree.aoi(id).await
    }

    /// The AOI's current root directory.
    pub async fn root_directory(&self, id: Uuid) -> AppResult<Directory> {
        self.tree.aoi_root(id).await
    }

    /// AOIs nested directly under `id`.
    pub async fn child_aois(&self, id: Uuid) -> AppResult<Vec<Aoi>> {
        self.tree.aoi(id).await?;
        self.tree.aois.find_children(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aoi::matcher::NearestPourPointMatcher;
    use crate::import::source::DirectorySource;
    use crate::test_support::{Fixture, write_aoi_bundle};
    use aoistore_core::error::ErrorKind;

    fn service(fx: &Fixture) -> AoiService {
        let matcher = Arc::new(NearestPourPointMatcher::new(fx.tree.aois.clone(), fx.clock.clone()));
        AoiService::new(fx.tree.clone(), fx.coordinator.clone(), matcher, fx.clock.clone())
    }

    async fn request(fx: &Fixture, name: &str) -> CreateAoiRequest {
        let dir = fx.output_dir();
        let path = write_aoi_bundle(&dir, name).await;
        CreateAoiRequest {
            name: name.to_string(),
            source: DirectorySource::shared(path).await.unwrap(),
            boundary: None,
            pourpoint: Some(GeoPoint {
                longitude: -110.5,
                latitude: 44.6,
            }),
            parent_aoi_id: None,
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_create_aoi_imports_every_component() {
        let fx = Fixture::new().await;
        let aois = service(&fx);
        let aoi = aois.create_aoi(&fx.ctx(), request(&fx, "Basin 1").await).await.unwrap();

        assert_eq!(aoi.shortname, "Basin_1");
        assert_eq!(aoi.status, NodeStatus::Finalized);
        assert!(aoi.pourpoint_id.is_some());

        let root = aois.root_directory(aoi.id).await.unwrap();
        assert_eq!(root.type_tag, "AOIDirectory");
        let children = fx.tree.children(root.id, None).await.unwrap();
        let mut tags: Vec<&str> = children.directories.iter().map(|d| d.type_tag.as_str()).collect();
        tags.sort();
        assert_eq!(tags, vec!["AOIdb", "Analysis", "Layers", "PrismDir", "Surfaces"]);
    }

    #[tokio::test]
    async fn test_duplicate_aoi_name_conflicts() {
        let fx = Fixture::new().await;
        let aois = service(&fx);
        aois.create_aoi(&fx.ctx(), request(&fx, "Basin1").await).await.unwrap();

        let err = aois
            .create_aoi(&fx.ctx(), request(&fx, "Basin1").await)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(aois.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_bundle_leaves_no_aoi() {
        let fx = Fixture::new().await;
        let aois = service(&fx);
        let req = request(&fx, "Basin1").await;
        tokio::fs::remove_dir_all(req.source.location().join("prism.gdb"))
            .await
            .unwrap();

        let err = aois.create_aoi(&fx.ctx(), req).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(aois.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_parent_aoi_is_not_found() {
        let fx = Fixture::new().await;
        let aois = service(&fx);
        let mut req = request(&fx, "Basin1").await;
        req.parent_aoi_id = Some(Uuid::new_v4());

        let err = aois.create_aoi(&fx.ctx(), req).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
