//! Error types for the tags module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing tags.
#[derive(Debug, Error)]
pub enum TagError {
    /// The file to tag does not exist.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The tagging process could not be started.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tagging process reported failure.
    #[error("Failed to write tags to {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    /// I/O error while replacing the tagged file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TagError {
    pub fn write_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
