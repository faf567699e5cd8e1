//! Error types for the finalize module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while moving a file into place.
#[derive(Debug, Error)]
pub enum FinalizeError {
    /// Source file not found.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Failed to create destination directory.
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An existing destination file could not be removed.
    #[error("Failed to remove existing file {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move/rename file.
    #[error("Failed to move file from {source} to {destination}: {error}")]
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl FinalizeError {
    pub fn move_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed {
            source,
            destination,
            error,
        }
    }
}
