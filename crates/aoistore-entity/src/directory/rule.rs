//! Archiving rule enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a directory retains history when its content changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ArchivingRule {
    /// Content is replaced in place; files may still version individually.
    None,
    /// Each contained file accumulates its own versions.
    Individual,
    /// The whole directory is re-created as a timestamped sibling.
    Group,
    /// Content is imported once and never updated.
    ReadOnly,
}

impl ArchivingRule {
    /// Return the rule as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Individual => "individual",
            Self::Group => "group",
            Self::ReadOnly => "readonly",
        }
    }

    /// Whether files directly inside a directory with this rule may gain
    /// new versions after creation.
    pub fn allows_file_versions(&self) -> bool {
        matches!(self, Self::None | Self::Individual)
    }

    /// Whether the on-disk name carries a creation timestamp suffix.
    pub fn is_timestamped(&self) -> bool {
        matches!(self, Self::Group)
    }
}

impl fmt::Display for ArchivingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ArchivingRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "individual" => Ok(Self::Individual),
            "group" => Ok(Self::Group),
            "readonly" | "read_only" => Ok(Self::ReadOnly),
            other => Err(format!("unknown archiving rule '{other}'")),
        }
    }
}
