//! Error types for ffmpeg runs.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running ffmpeg.
#[derive(Debug, Error)]
pub enum FfmpegError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    NotFound { path: PathBuf },

    /// FFmpeg exited unsuccessfully.
    #[error("FFmpeg exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    /// The run exceeded the configured timeout.
    #[error("FFmpeg timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The run was stopped on request.
    #[error("FFmpeg run cancelled")]
    Cancelled,

    /// I/O error while talking to the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FfmpegError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
