//! Unified error types for page-diff.
//!
//! Errors carry enough context to tell the caller which session, group,
//! or computation failed and whether a retry makes sense.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for page-diff operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PageDiffError {
    /// Errors while ingesting a document into a page group
    #[error("Failed to read document '{label}': {source}")]
    Ingest {
        label: String,
        #[source]
        source: IngestErrorKind,
    },

    /// Both groups failed to produce any pages
    #[error("No content: neither group produced a readable page")]
    NoContent,

    /// Session lookup failures
    #[error("Session {id}: {source}")]
    Session {
        id: String,
        #[source]
        source: SessionErrorKind,
    },

    /// Errors during alignment computation
    #[error("Alignment failed: {source}")]
    Align {
        #[source]
        source: AlignErrorKind,
    },

    /// IO errors with path context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Validation errors (bad manual pairs, malformed inputs)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Durable store failures
    #[error("Session store error: {0}")]
    Store(String),
}

/// Specific ingestion error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IngestErrorKind {
    #[error("unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("image decode failed: {0}")]
    Decode(String),
}

/// Specific session error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SessionErrorKind {
    #[error("not found")]
    NotFound,

    #[error("expired")]
    Expired,
}

/// Specific alignment error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AlignErrorKind {
    #[error(
        "timed out after {elapsed:?} (budget {budget:?}); retry with fewer \
         pages or a narrower band"
    )]
    Timeout { elapsed: Duration, budget: Duration },

    #[error("manual pairs cross: ({a0},{b0}) conflicts with ({a1},{b1})")]
    CrossingPairs {
        a0: usize,
        b0: usize,
        a1: usize,
        b1: usize,
    },
}

/// Convenient Result type for page-diff operations
pub type Result<T> = std::result::Result<T, PageDiffError>;

impl PageDiffError {
    /// Create an ingestion error for a labeled document
    pub fn ingest(label: impl Into<String>, source: IngestErrorKind) -> Self {
        Self::Ingest {
            label: label.into(),
            source,
        }
    }

    /// Create an unreadable-document error
    pub fn unreadable(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ingest(label, IngestErrorKind::UnreadableDocument(reason.into()))
    }

    /// Create a session-not-found error
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::Session {
            id: id.into(),
            source: SessionErrorKind::NotFound,
        }
    }

    /// Create a session-expired error
    pub fn session_expired(id: impl Into<String>) -> Self {
        Self::Session {
            id: id.into(),
            source: SessionErrorKind::Expired,
        }
    }

    /// Create an alignment timeout error
    pub fn align_timeout(elapsed: Duration, budget: Duration) -> Self {
        Self::Align {
            source: AlignErrorKind::Timeout { elapsed, budget },
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the caller may retry the operation (possibly with
    /// different parameters). Session and validation failures are
    /// terminal; timeouts are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Align {
                source: AlignErrorKind::Timeout { .. }
            }
        )
    }
}

impl From<std::io::Error> for PageDiffError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for PageDiffError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(format!("JSON serialization: {err}"))
    }
}

impl From<image::ImageError> for PageDiffError {
    fn from(err: image::ImageError) -> Self {
        Self::Ingest {
            label: String::new(),
            source: IngestErrorKind::Decode(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PageDiffError::session_not_found("abc-123");
        assert!(err.to_string().contains("abc-123"));

        let err = PageDiffError::unreadable("report.pdf", "corrupt header");
        assert!(err.to_string().contains("report.pdf"));
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err =
            PageDiffError::align_timeout(Duration::from_secs(31), Duration::from_secs(30));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("narrower band"));

        assert!(!PageDiffError::session_expired("x").is_retryable());
        assert!(!PageDiffError::NoContent.is_retryable());
    }

    #[test]
    fn test_io_error_keeps_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = PageDiffError::io("/tmp/pages/a.png", io_err);
        assert!(err.to_string().contains("/tmp/pages/a.png"));
    }
}
