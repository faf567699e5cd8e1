use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ffmpeg::FfmpegConfig;
use crate::profile::Profile;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
    #[serde(default)]
    pub profile: Profile,
}

/// Scheduling and working-directory settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// Split workers allowed to run at once across all discs.
    #[serde(default = "default_max_parallel_splits")]
    pub max_parallel_splits: usize,
    /// Encode workers allowed to run at once across all discs.
    #[serde(default = "default_max_parallel_encodes")]
    pub max_parallel_encodes: usize,
    /// Directory receiving each run's temporary directory.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Grace period for each step of worker thread teardown.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_parallel_splits: default_max_parallel_splits(),
            max_parallel_encodes: default_max_parallel_encodes(),
            work_dir: default_work_dir(),
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

impl RunnerConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// Sets both parallelism limits.
    pub fn with_parallelism(mut self, splits: usize, encodes: usize) -> Self {
        self.max_parallel_splits = splits;
        self.max_parallel_encodes = encodes;
        self
    }

    /// Sets the work directory.
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Sets the teardown grace period in milliseconds.
    pub fn with_stop_grace_ms(mut self, ms: u64) -> Self {
        self.stop_grace_ms = ms;
        self
    }
}

fn default_max_parallel_splits() -> usize {
    1
}

fn default_max_parallel_encodes() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("discoder")
}

fn default_stop_grace_ms() -> u64 {
    3000
}
