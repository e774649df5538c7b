//! Lifecycle state shared by AOIs, directories and files.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation progress of a record.
///
/// Rows are inserted as `Provisional` and only become `Finalized` once their
/// content has been fully imported. Provisional rows are invisible to
/// listings and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Content import in progress.
    Provisional,
    /// Fully created.
    Finalized,
}

impl NodeStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisional => "provisional",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of a node in the forward-only lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Active and not removed: the current content.
    Current,
    /// Active but soft-removed: still visible to historical queries.
    Removed,
    /// Inactive and removed: fully archived.
    Archived,
    /// Inactive without a removal stamp. Only reachable through a variant
    /// that allows deactivating live content.
    Inactive,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Current => "current",
            Self::Removed => "removed",
            Self::Archived => "archived",
            Self::Inactive => "inactive",
        };
        write!(f, "{s}")
    }
}

/// Accessors for the columns every tree member carries.
pub trait NodeLifecycle {
    /// Creation instant.
    fn created_at(&self) -> DateTime<Utc>;
    /// Soft-removal instant.
    fn removed_at(&self) -> Option<DateTime<Utc>>;
    /// The `active` flag.
    fn is_active(&self) -> bool;
    /// Creation progress.
    fn status(&self) -> NodeStatus;

    /// Where the node sits in the lifecycle.
    fn state(&self) -> NodeState {
        match (self.is_active(), self.removed_at().is_some()) {
            (true, false) => NodeState::Current,
            (true, true) => NodeState::Removed,
            (false, true) => NodeState::Archived,
            (false, false) => NodeState::Inactive,
        }
    }

    /// Finalized, active and not removed.
    fn is_current(&self) -> bool {
        self.status() == NodeStatus::Finalized && self.state() == NodeState::Current
    }

    /// Whether the node existed, and had not yet been removed, at `as_of`.
    ///
    /// Inactive nodes are never visible, not even historically.
    fn visible_at(&self, as_of: DateTime<Utc>) -> bool {
        self.status() == NodeStatus::Finalized
            && self.is_active()
            && self.created_at() <= as_of
            && self.removed_at().is_none_or(|removed| removed > as_of)
    }
}
