//! Error types for the encoder module.

use std::path::PathBuf;
use thiserror::Error;

use crate::ffmpeg::FfmpegError;

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory: {path}")]
    OutputDirectoryFailed { path: PathBuf },

    /// The encoder process failed.
    #[error("Encoding failed: {0}")]
    Ffmpeg(#[from] FfmpegError),

    /// The encoder reported success but left no output.
    #[error("Output file not created: {path}")]
    OutputMissing { path: PathBuf },

    /// Replay gain could not be measured.
    #[error("Failed to measure replay gain: {reason}")]
    GainMeasurementFailed { reason: String },

    /// I/O error during encoding.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EncoderError {
    pub fn gain_measurement_failed(reason: impl Into<String>) -> Self {
        Self::GainMeasurementFailed {
            reason: reason.into(),
        }
    }

    /// Whether the encode was stopped on request rather than failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Ffmpeg(e) if e.is_cancelled())
    }
}
