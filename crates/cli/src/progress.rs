//! Progress reporting on stdout.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;

use discoder_core::{PipelineEvent, PipelineId, RunSummary, TrackState};

/// Turns pipeline events into output lines.
///
/// Plain output shows one line per track state change; JSON output shows
/// every event, timestamped.
pub struct Reporter {
    json: bool,
    albums: HashMap<PipelineId, String>,
    last: HashMap<(PipelineId, usize), TrackState>,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            albums: HashMap::new(),
            last: HashMap::new(),
        }
    }

    /// Names the disc of `pipeline` in plain output.
    pub fn add_album(&mut self, pipeline: PipelineId, album: String) {
        self.albums.insert(pipeline, album);
    }

    pub fn line(&mut self, event: &PipelineEvent) -> Option<String> {
        if self.json {
            let value = json!({ "at": Utc::now().to_rfc3339(), "event": event });
            return Some(value.to_string());
        }

        let album = self.album(event.pipeline());
        match event {
            PipelineEvent::TrackProgress {
                pipeline,
                track,
                state,
                ..
            } => {
                let previous = self.last.insert((*pipeline, *track), *state);
                (previous != Some(*state))
                    .then(|| format!("[{}] track {}: {}", album, track + 1, state))
            }
            PipelineEvent::Error { track, message, .. } => {
                Some(format!("[{}] track {} failed: {}", album, track + 1, message))
            }
            PipelineEvent::Finished { success, .. } => Some(format!(
                "[{}] {}",
                album,
                if *success { "done" } else { "failed" }
            )),
        }
    }

    fn album(&self, pipeline: PipelineId) -> String {
        self.albums
            .get(&pipeline)
            .cloned()
            .unwrap_or_else(|| pipeline.short())
    }
}

/// Final report, one line per disc.
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    summary
        .discs
        .iter()
        .map(|disc| {
            let ok = disc
                .tracks
                .iter()
                .filter(|(_, s)| *s == TrackState::Ok)
                .count();
            format!(
                "{}: {} ({}/{} tracks)",
                disc.album,
                if disc.success { "ok" } else { "failed" },
                ok,
                disc.tracks.len()
            )
        })
        .collect()
}
