//! Typed references to tree members.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which table a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A row in `directories`.
    Directory,
    /// A row in `files`.
    File,
}

impl NodeKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::File => "file",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Address of a directory or file in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Table the node lives in.
    pub kind: NodeKind,
    /// Row identifier.
    pub id: Uuid,
}

impl NodeRef {
    /// Reference a directory.
    pub fn directory(id: Uuid) -> Self {
        Self {
            kind: NodeKind::Directory,
            id,
        }
    }

    /// Reference a file.
    pub fn file(id: Uuid) -> Self {
        Self {
            kind: NodeKind::File,
            id,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for NodeRef {
    type Err = String;

    /// Parse `directory:<uuid>` or `file:<uuid>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <directory|file>:<uuid>, got '{s}'"))?;
        let id = Uuid::parse_str(id).map_err(|e| format!("invalid node id '{id}': {e}"))?;
        match kind {
            "directory" | "dir" => Ok(Self::directory(id)),
            "file" => Ok(Self::file(id)),
            other => Err(format!("unknown node kind '{other}'")),
        }
    }
}
