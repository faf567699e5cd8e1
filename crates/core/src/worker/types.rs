//! Types for the worker module.

use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::gain::ReplayGain;

/// Identifies one disc pipeline; worker messages carry it so a shared
/// channel can be demultiplexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(Uuid);

impl PipelineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for thread names and log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for PipelineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a worker within its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// The two worker variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Split,
    Encode,
}

impl WorkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::Encode => "encode",
        }
    }
}

/// Stop request delivered to a running worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopSignal {
    #[default]
    Run,
    /// Finish cooperatively as soon as possible.
    Stop,
    /// Abandon work immediately, killing any child process.
    Terminate,
}

/// Something a worker reports to its pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Progress of `track` in percent (0..=100).
    Progress { track: usize, percent: u8 },
    /// The splitter finished the decoded file for `track`.
    SplitReady { track: usize, file: PathBuf },
    /// The splitter extracted the leading pregap region.
    PregapReady { file: PathBuf },
    /// The encoder finished `track`. `gain` is present when it was measured.
    EncodeReady {
        track: usize,
        file: PathBuf,
        gain: Option<ReplayGain>,
    },
    /// Unrecoverable failure while working on `track`.
    Error { track: usize, message: String },
    /// The worker's run method has returned; always the last event.
    Finished,
}

/// A [`WorkerEvent`] addressed with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerMessage {
    pub pipeline: PipelineId,
    pub worker: WorkerId,
    pub kind: WorkerKind,
    pub event: WorkerEvent,
}
