//! Types for the runner module.

use serde::Serialize;

use crate::pipeline::TrackState;
use crate::worker::PipelineId;

/// Outcome of one disc.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscSummary {
    #[serde(serialize_with = "serialize_id")]
    pub pipeline: PipelineId,
    pub album: String,
    pub success: bool,
    /// Final state of every track in the run, by track index.
    pub tracks: Vec<(usize, TrackState)>,
}

/// Outcome of a whole run, in the order discs were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub discs: Vec<DiscSummary>,
}

impl RunSummary {
    /// True when every disc converted completely.
    pub fn success(&self) -> bool {
        self.discs.iter().all(|d| d.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DiscSummary> {
        self.discs.iter().filter(|d| !d.success)
    }
}

fn serialize_id<S: serde::Serializer>(id: &PipelineId, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(id)
}
