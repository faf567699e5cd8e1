//! Types for the encoder module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::gain::ReplayGain;
use crate::profile::Profile;
use crate::tags::TrackMetadata;

/// A single-track encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeJob {
    /// Track index within the disc.
    pub track: usize,
    /// Decoded input produced by the splitter.
    pub input_path: PathBuf,
    /// Temporary output path.
    pub output_path: PathBuf,
    pub profile: Profile,
    pub metadata: TrackMetadata,
    /// Cover image to embed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_path: Option<PathBuf>,
    /// Expected duration, for progress reporting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Whether to measure replay gain.
    #[serde(default)]
    pub measure_gain: bool,
}

impl EncodeJob {
    /// Temporary output path for `input` encoded into a file with
    /// `extension`, placed in `dir`: `<input stem>.encoded.<extension>`.
    pub fn temp_output_path(dir: &Path, input: &Path, extension: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "track".to_string());
        dir.join(format!("{}.encoded.{}", stem, extension))
    }
}

/// Result of a successful encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeOutput {
    pub track: usize,
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain: Option<ReplayGain>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_output_path() {
        let path = EncodeJob::temp_output_path(
            Path::new("/tmp/run"),
            Path::new("/tmp/run/track-03.wav"),
            "opus",
        );
        assert_eq!(path, PathBuf::from("/tmp/run/track-03.encoded.opus"));
    }
}
