//! Error types for the attachments module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop attachment processing before any per-file work starts.
///
/// Per-attachment failures are not errors at this level; they are recorded
/// as outcomes in the pipeline report.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// A link pattern built from the configured hosts failed to compile.
    #[error("invalid attachment link pattern: {source}")]
    Pattern {
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// The staging directory could not be created.
    #[error("cannot create staging directory {path}: {source}")]
    StagingDir {
        /// Directory that was being created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl AttachmentError {
    /// Creates a pattern error.
    #[must_use]
    pub fn pattern(source: regex::Error) -> Self {
        Self::Pattern { source }
    }

    /// Creates a staging directory error.
    #[must_use]
    pub fn staging_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StagingDir {
            path: path.into(),
            source,
        }
    }
}

/// Failure reported by a [`super::RenderedBodySource`] implementation.
#[derive(Debug, Error)]
#[error("failed to fetch rendered body for {target}: {source}")]
pub struct RenderedBodyError {
    /// The source text that was being looked up (e.g. `issue_comment#42`).
    pub target: String,
    /// The underlying collaborator error.
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl RenderedBodyError {
    /// Wraps a collaborator error for the given lookup target.
    pub fn new(
        target: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
        }
    }
}
