//! Configuration for ffmpeg invocations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How ffmpeg is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfmpegConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Timeout for a single ffmpeg run in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Additional ffmpeg arguments placed before the output path.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_log_level() -> String {
    "warning".to_string()
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            log_level: default_log_level(),
            timeout_secs: default_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl FfmpegConfig {
    /// Creates a config with a custom ffmpeg path.
    pub fn with_path(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FfmpegConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.log_level, "warning");
        assert_eq!(config.timeout_secs, 3600);
    }

    #[test]
    fn test_config_builder() {
        let config = FfmpegConfig::with_path(PathBuf::from("/usr/local/bin/ffmpeg")).with_timeout(60);
        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_partial_toml() {
        let config: FfmpegConfig = toml::from_str("log_level = \"error\"").unwrap();
        assert_eq!(config.log_level, "error");
        assert_eq!(config.timeout_secs, 3600);
    }
}
