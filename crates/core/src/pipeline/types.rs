//! Types for the pipeline module.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::gain::ReplayGain;
use crate::profile::PregapMode;
use crate::worker::PipelineId;

/// Where a track is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    NotRunning,
    Splitting,
    Queued,
    Encoding,
    WaitGain,
    CalcGain,
    WriteGain,
    Ok,
    Canceled,
    Error,
    Aborted,
}

impl TrackState {
    /// Terminal states are never left once entered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ok | Self::Canceled | Self::Error | Self::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRunning => "not_running",
            Self::Splitting => "splitting",
            Self::Queued => "queued",
            Self::Encoding => "encoding",
            Self::WaitGain => "wait_gain",
            Self::CalcGain => "calc_gain",
            Self::WriteGain => "write_gain",
            Self::Ok => "ok",
            Self::Canceled => "canceled",
            Self::Error => "error",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one split of a run: every track, cut together.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRequest {
    /// Track indexes, in disc order.
    pub tracks: Vec<usize>,
    pub out_dir: PathBuf,
    pub pregap: PregapMode,
}

/// A decoded track waiting for an encode slot.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub track: usize,
    pub input: PathBuf,
}

/// A tagged but not yet finalized track, held until the album gain is known.
#[derive(Debug, Clone, PartialEq)]
pub struct GainRecord {
    pub track: usize,
    pub file: PathBuf,
    pub gain: ReplayGain,
}

/// Free worker slots offered to [`DiscPipeline::schedule`](super::DiscPipeline::schedule).
///
/// The pipeline decrements the counters for every worker it starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slots {
    pub split: usize,
    pub encode: usize,
}

impl Slots {
    pub fn new(split: usize, encode: usize) -> Self {
        Self { split, encode }
    }
}

/// Something the pipeline reports to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A track changed state or progress.
    TrackProgress {
        #[serde(serialize_with = "display")]
        pipeline: PipelineId,
        track: usize,
        state: TrackState,
        percent: u8,
    },
    /// The run failed; `message` is meant for the user.
    Error {
        #[serde(serialize_with = "display")]
        pipeline: PipelineId,
        track: usize,
        message: String,
    },
    /// Every track reached a terminal state. Sent exactly once per pipeline.
    Finished {
        #[serde(serialize_with = "display")]
        pipeline: PipelineId,
        success: bool,
    },
}

impl PipelineEvent {
    pub fn pipeline(&self) -> PipelineId {
        match self {
            Self::TrackProgress { pipeline, .. }
            | Self::Error { pipeline, .. }
            | Self::Finished { pipeline, .. } => *pipeline,
        }
    }
}

fn display<S: serde::Serializer>(value: &PipelineId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
