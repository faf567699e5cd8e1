//! Mock encoder for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use super::journal::{Journal, JournalEntry};
use super::wait_for_stop;
use crate::encoder::{EncodeJob, EncodeOutput, Encoder, EncoderError};
use crate::ffmpeg::FfmpegError;
use crate::gain::ReplayGain;
use crate::worker::StopSignal;

/// Gain reported for tracks without a scripted one.
pub const DEFAULT_MOCK_GAIN: ReplayGain = ReplayGain {
    gain_db: -6.5,
    peak: 0.95,
};

#[derive(Debug, Default, Clone)]
struct Script {
    gains: HashMap<usize, ReplayGain>,
    fail_tracks: HashSet<usize>,
    block_tracks: HashSet<usize>,
    omit_gain: bool,
    delay: Duration,
}

/// Mock implementation of the Encoder trait.
///
/// Writes a placeholder output file and reports scripted replay-gain values.
/// Tracks can be made to fail or to hang until stopped. The number of
/// encodes running at once is tracked for slot assertions.
#[derive(Debug)]
pub struct MockEncoder {
    journal: Journal,
    script: Mutex<Script>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl MockEncoder {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            script: Mutex::new(Script::default()),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    /// Gain measured for `track`.
    pub fn set_gain(&self, track: usize, gain: ReplayGain) {
        self.script().gains.insert(track, gain);
    }

    pub fn fail_on(&self, track: usize) {
        self.script().fail_tracks.insert(track);
    }

    /// Makes the encode of `track` wait for a stop request.
    pub fn block_on(&self, track: usize) {
        self.script().block_tracks.insert(track);
    }

    /// Reports success without a gain even when one was requested.
    pub fn omit_gain(&self) {
        self.script().omit_gain = true;
    }

    /// Time each encode takes.
    pub fn set_delay(&self, delay: Duration) {
        self.script().delay = delay;
    }

    /// Highest number of encodes observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn encode_inner(
        &self,
        job: EncodeJob,
        progress_tx: mpsc::Sender<u8>,
        stop: watch::Receiver<StopSignal>,
    ) -> Result<EncodeOutput, EncoderError> {
        let script = self.script().clone();
        let track = job.track;

        let _ = progress_tx.send(50).await;

        if script.block_tracks.contains(&track) {
            wait_for_stop(stop).await;
            return Err(FfmpegError::Cancelled.into());
        }
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        if script.fail_tracks.contains(&track) {
            return Err(EncoderError::OutputMissing {
                path: job.output_path,
            });
        }

        std::fs::write(&job.output_path, b"encoded")?;
        let _ = progress_tx.send(100).await;

        let gain = match job.measure_gain && !script.omit_gain {
            true => Some(script.gains.get(&track).copied().unwrap_or(DEFAULT_MOCK_GAIN)),
            false => None,
        };
        self.journal.record(JournalEntry::EncodeFinished { track });

        Ok(EncodeOutput {
            track,
            output_path: job.output_path,
            output_size_bytes: 7,
            duration_ms: script.delay.as_millis() as u64,
            gain,
        })
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn encode(
        &self,
        job: EncodeJob,
        progress_tx: mpsc::Sender<u8>,
        stop: watch::Receiver<StopSignal>,
    ) -> Result<EncodeOutput, EncoderError> {
        self.journal.record(JournalEntry::EncodeStarted { track: job.track });
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        let result = self.encode_inner(job, progress_tx, stop).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
