//! Mock splitter for testing.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use super::journal::{Journal, JournalEntry};
use super::wait_for_stop;
use crate::ffmpeg::FfmpegError;
use crate::splitter::{SplitEvent, SplitJob, Splitter, SplitterError};
use crate::worker::StopSignal;

#[derive(Debug, Default, Clone)]
struct Script {
    order: Option<Vec<usize>>,
    fail_track: Option<usize>,
    block_after: Option<usize>,
    delay: Duration,
}

/// Mock implementation of the Splitter trait.
///
/// Writes a small placeholder file per region into the job's output
/// directory and reports it. Behavior is scripted:
/// - Report tracks in a custom order
/// - Fail on a given track
/// - Hang after a number of tracks until stopped
#[derive(Debug)]
pub struct MockSplitter {
    journal: Journal,
    script: Mutex<Script>,
}

impl MockSplitter {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            script: Mutex::new(Script::default()),
        }
    }

    /// Reports tracks in this order of track indexes instead of disc order.
    pub fn set_order(&self, order: Vec<usize>) {
        self.script().order = Some(order);
    }

    /// Fails with an error attributed to `track` when its turn comes.
    pub fn fail_on(&self, track: usize) {
        self.script().fail_track = Some(track);
    }

    /// Stops reporting after `count` tracks and waits for a stop request.
    pub fn block_after(&self, count: usize) {
        self.script().block_after = Some(count);
    }

    /// Pause between two reported tracks.
    pub fn set_delay(&self, delay: Duration) {
        self.script().delay = delay;
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Splitter for MockSplitter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn split(
        &self,
        job: SplitJob,
        events: mpsc::UnboundedSender<SplitEvent>,
        stop: watch::Receiver<StopSignal>,
    ) -> Result<(), SplitterError> {
        let script = self.script().clone();
        self.journal.record(JournalEntry::SplitStarted {
            tracks: job.tracks.iter().map(|t| t.index).collect(),
        });

        let mut regions = job.regions();
        if let Some(order) = &script.order {
            regions.sort_by_key(|r| {
                let rank = order.iter().position(|t| *t == r.track).unwrap_or(usize::MAX);
                (rank, !r.is_pregap)
            });
        }

        let mut reported = 0;
        for region in regions {
            if script.block_after == Some(reported) {
                wait_for_stop(stop.clone()).await;
                return Err(SplitterError::Ffmpeg {
                    track: region.track,
                    number: 0,
                    source: FfmpegError::Cancelled,
                });
            }

            if script.fail_track == Some(region.track) && !region.is_pregap {
                return Err(SplitterError::OutputMissing {
                    track: region.track,
                    path: region.output,
                });
            }

            if !script.delay.is_zero() {
                tokio::time::sleep(script.delay).await;
            }

            std::fs::write(&region.output, b"RIFF").map_err(|source| {
                SplitterError::OutputDirectoryFailed {
                    track: region.track,
                    path: region.output.clone(),
                    source,
                }
            })?;

            let _ = events.send(SplitEvent::Progress {
                track: region.track,
                percent: 100,
            });
            if region.is_pregap {
                self.journal.record(JournalEntry::PregapReady);
                let _ = events.send(SplitEvent::PregapReady {
                    file: region.output,
                });
            } else {
                self.journal.record(JournalEntry::SplitReady {
                    track: region.track,
                });
                let _ = events.send(SplitEvent::TrackReady {
                    track: region.track,
                    file: region.output,
                });
                reported += 1;
            }
        }

        Ok(())
    }
}
