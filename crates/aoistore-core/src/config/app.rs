//! Application identity configuration.

use serde::{Deserialize, Serialize};

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    /// Display name of this deployment.
    #[serde(default = "default_name")]
    pub name: String,
    /// Base URL under which nodes are addressable externally.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            public_url: default_public_url(),
        }
    }
}

fn default_name() -> String {
    "aoistore".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}
