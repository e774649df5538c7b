//! Unified application error types for the content store.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The referenced node or version does not exist.
    NotFound,
    /// A content source or request was malformed or incomplete.
    Validation,
    /// A name is already taken among the active siblings.
    Conflict,
    /// A query instant lies before creation or in the future.
    TemporalQuery,
    /// A filesystem operation failed.
    Filesystem,
    /// Node creation failed after the record was persisted and was rolled back.
    PartialImport,
    /// The archiving policy forbids updating this content.
    ReadOnly,
    /// The operation was cancelled cooperatively.
    Cancelled,
    /// A database error occurred.
    Database,
    /// A configuration error occurred (including unknown variant tags).
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::TemporalQuery => write!(f, "TEMPORAL_QUERY"),
            Self::Filesystem => write!(f, "FILESYSTEM"),
            Self::PartialImport => write!(f, "PARTIAL_IMPORT"),
            Self::ReadOnly => write!(f, "READ_ONLY"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a temporal query error.
    pub fn temporal_query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TemporalQuery, message)
    }

    /// Create a filesystem error.
    pub fn filesystem(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Filesystem, message)
    }

    /// Wrap an I/O failure on `path` as a filesystem error.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Filesystem, message, err)
    }

    /// Wrap the error that aborted a node creation.
    ///
    /// An error that is already a partial import failure is returned as is,
    /// so nested creations report the innermost failure once.
    pub fn partial_import(cause: AppError) -> Self {
        if cause.kind == ErrorKind::PartialImport {
            return cause;
        }
        Self {
            kind: ErrorKind::PartialImport,
            message: format!("Import rolled back: {cause}"),
            source: Some(Box::new(cause)),
        }
    }

    /// Create a read-only policy violation.
    pub fn read_only(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReadOnly, message)
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this is a filesystem error caused by a path that does not exist.
    pub fn is_path_absent(&self) -> bool {
        if self.kind != ErrorKind::Filesystem {
            return false;
        }
        self.source
            .as_ref()
            .and_then(|s| s.downcast_ref::<std::io::Error>())
            .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
    }

    /// The kind of the innermost [`AppError`] in the source chain.
    pub fn root_kind(&self) -> ErrorKind {
        let mut current = self;
        while let Some(inner) = current
            .source
            .as_ref()
            .and_then(|s| s.downcast_ref::<AppError>())
        {
            current = inner;
        }
        current.kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Filesystem, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_absent_detection() {
        let missing = AppError::io(
            "remove",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(missing.is_path_absent());

        let denied = AppError::io(
            "remove",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(!denied.is_path_absent());
        assert!(!AppError::not_found("x").is_path_absent());
    }

    #[test]
    fn test_partial_import_is_not_nested() {
        let cause = AppError::validation("layer missing");
        let wrapped = AppError::partial_import(cause);
        assert_eq!(wrapped.kind, ErrorKind::PartialImport);
        assert_eq!(wrapped.root_kind(), ErrorKind::Validation);

        let rewrapped = AppError::partial_import(wrapped);
        assert_eq!(rewrapped.kind, ErrorKind::PartialImport);
        assert_eq!(rewrapped.root_kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::conflict("name taken");
        assert_eq!(err.to_string(), "CONFLICT: name taken");
    }
}
