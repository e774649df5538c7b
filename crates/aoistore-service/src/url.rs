//! Stable external identifiers for nodes.

use std::sync::Arc;

use uuid::Uuid;

use aoistore_core::result::AppResult;

use crate::registry::NodeRegistry;
use crate::tree::Node;

/// Builds `{public_url}/{collection}/{id}` identifiers.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    /// Base URL without a trailing slash.
    base: String,
    /// Variant lookup for collection names.
    registry: Arc<NodeRegistry>,
}

impl UrlResolver {
    pub fn new(public_url: &str, registry: Arc<NodeRegistry>) -> Self {
        Self {
            base: public_url.trim_end_matches('/').to_string(),
            registry,
        }
    }

    /// URL of a tree node, keyed by its variant's plural name.
    pub fn resolve(&self, node: &Node) -> AppResult<String> {
        let variant = self.registry.resolve(node.type_tag())?;
        Ok(format!("{}/{}/{}", self.base, variant.plural_name(), node.id()))
    }

    /// URL of an AOI.
    pub fn resolve_aoi(&self, aoi_id: Uuid) -> String {
        format!("{}/aois/{aoi_id}", self.base)
    }
}
