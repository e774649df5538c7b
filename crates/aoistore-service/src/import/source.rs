//! Content sources handed to importers.
//!
//! A source is a directory-like bundle: it yields named layers (single files
//! with a kind derived from their extension) and nested sub-sources. The
//! store never interprets layer bytes; it only copies them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;

/// Kind of a source layer, derived from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Feature class (`.shp`).
    Vector,
    /// Raster dataset (`.img`, `.tif`).
    Raster,
    /// Attribute table (`.dbf`).
    Table,
    /// XML document.
    Xml,
    /// Map document (`.mxd`).
    MapDocument,
    /// Anything else.
    Other,
}

impl LayerKind {
    /// Classifies a file by extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "shp" => Self::Vector,
            "img" | "tif" | "tiff" => Self::Raster,
            "dbf" => Self::Table,
            "xml" => Self::Xml,
            "mxd" => Self::MapDocument,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Vector => "vector",
            Self::Raster => "raster",
            Self::Table => "table",
            Self::Xml => "xml",
            Self::MapDocument => "map document",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// One importable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayer {
    /// Layer name (file stem).
    pub name: String,
    /// Full file name including extension.
    pub file_name: String,
    /// Kind derived from the extension.
    pub kind: LayerKind,
    /// Location on disk.
    pub path: PathBuf,
}

impl SourceLayer {
    /// Describes the file at `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::validation(format!("Invalid layer path {}", path.display())))?
            .to_string();
        let (name, kind) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), LayerKind::from_extension(ext)),
            _ => (file_name.clone(), LayerKind::Other),
        };
        Ok(Self {
            name,
            file_name,
            kind,
            path,
        })
    }

    /// Lowercase extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// A bundle of layers and nested bundles.
#[async_trait]
pub trait ContentSource: Send + Sync + fmt::Debug {
    /// Name of the bundle (final path component).
    fn name(&self) -> &str;

    /// Where the bundle lives.
    fn location(&self) -> &Path;

    /// Files directly inside the bundle, sorted by file name.
    async fn layers(&self) -> AppResult<Vec<SourceLayer>>;

    /// Nested bundles, sorted by name.
    async fn children(&self) -> AppResult<Vec<Arc<dyn ContentSource>>>;

    /// A nested bundle by name (case-insensitive).
    async fn child(&self, name: &str) -> AppResult<Option<Arc<dyn ContentSource>>> {
        Ok(self
            .children()
            .await?
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name)))
    }

    /// A layer by file name (case-insensitive).
    async fn layer(&self, file_name: &str) -> AppResult<Option<SourceLayer>> {
        Ok(self
            .layers()
            .await?
            .into_iter()
            .find(|l| l.file_name.eq_ignore_ascii_case(file_name)))
    }
}

/// A content source backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    name: String,
    path: PathBuf,
}

impl DirectorySource {
    /// Opens a directory as a content source.
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let meta = tokio::fs::metadata(&path).await.map_err(|e| {
            AppError::with_source(
                aoistore_core::ErrorKind::Validation,
                format!("Content source {} is not readable", path.display()),
                e,
            )
        })?;
        if !meta.is_dir() {
            return Err(AppError::validation(format!(
                "Content source {} is not a directory",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::validation(format!("Invalid source path {}", path.display())))?
            .to_string();
        Ok(Self { name, path })
    }

    /// Opens a directory and erases its type.
    pub async fn shared(path: impl Into<PathBuf>) -> AppResult<Arc<dyn ContentSource>> {
        Ok(Arc::new(Self::open(path).await?))
    }

    async fn entries(&self) -> AppResult<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut files = Vec::new();
        let mut dirs = Vec::new();
        let mut reader = tokio::fs::read_dir(&self.path)
            .await
            .map_err(|e| AppError::io(format!("Failed to read {}", self.path.display()), e))?;

        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| AppError::io(format!("Failed to read {}", self.path.display()), e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| AppError::io("Failed to stat source entry", e))?;
            if file_type.is_dir() {
                dirs.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }

        files.sort();
        dirs.sort();
        Ok((files, dirs))
    }
}

#[async_trait]
impl ContentSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &Path {
        &self.path
    }

    async fn layers(&self) -> AppResult<Vec<SourceLayer>> {
        let (files, _) = self.entries().await?;
        files.into_iter().map(SourceLayer::from_path).collect()
    }

    async fn children(&self) -> AppResult<Vec<Arc<dyn ContentSource>>> {
        let (_, dirs) = self.entries().await?;
        let mut children: Vec<Arc<dyn ContentSource>> = Vec::with_capacity(dirs.len());
        for dir in dirs {
            children.push(Arc::new(Self::open(dir).await?));
        }
        Ok(children)
    }
}
