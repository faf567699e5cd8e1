//! Error types for the splitter module.

use std::path::PathBuf;
use thiserror::Error;

use crate::ffmpeg::FfmpegError;

/// Errors that can occur while splitting. Each carries the index of the
/// track being cut when it happened.
#[derive(Debug, Error)]
pub enum SplitterError {
    /// Source audio file not found.
    #[error("Audio file not found: {path}")]
    InputNotFound { track: usize, path: PathBuf },

    /// Output directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    OutputDirectoryFailed {
        track: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cutting a region failed.
    #[error("Failed to split track {number}: {source}")]
    Ffmpeg {
        track: usize,
        number: u32,
        #[source]
        source: FfmpegError,
    },

    /// A region produced no output file.
    #[error("Split output not created: {path}")]
    OutputMissing { track: usize, path: PathBuf },
}

impl SplitterError {
    /// Index of the track the error belongs to.
    pub fn track(&self) -> usize {
        match self {
            Self::InputNotFound { track, .. }
            | Self::OutputDirectoryFailed { track, .. }
            | Self::Ffmpeg { track, .. }
            | Self::OutputMissing { track, .. } => *track,
        }
    }

    /// Whether the split was stopped on request rather than failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Ffmpeg { source, .. } if source.is_cancelled())
    }
}
