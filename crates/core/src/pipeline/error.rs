//! Error types for the pipeline module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a pipeline from being created.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A work or output directory does not exist and could not be created.
    #[error("Cannot create directory {path}: {source}")]
    DirectoryNotCreatable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A work or output directory exists but files cannot be created in it.
    #[error("Cannot write to directory {path}: {source}")]
    DirectoryNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The temporary directory for intermediate files could not be created.
    #[error("Cannot create temporary directory in {path}: {source}")]
    TempDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two tracks of the run share the same disc index.
    #[error("Track index {0} appears more than once")]
    DuplicateTrack(usize),

    /// There is nothing to convert.
    #[error("No tracks to convert")]
    EmptyTrackList,
}
