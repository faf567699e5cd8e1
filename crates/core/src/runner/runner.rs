//! The conversion runner implementation.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::types::{DiscSummary, RunSummary};
use crate::config::RunnerConfig;
use crate::disc::{Disc, Track};
use crate::pipeline::{
    DiscPipeline, PipelineError, PipelineEvent, PipelineSetup, Slots, Toolkit, TrackState,
};
use crate::profile::Profile;
use crate::worker::{PipelineId, WorkerKind, WorkerMessage};

/// Requests a running [`ConversionRunner`] to cancel every disc.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: broadcast::Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.tx.send(());
    }
}

/// Owns the disc pipelines of one run and drives them to completion.
pub struct ConversionRunner {
    config: RunnerConfig,
    toolkit: Toolkit,
    pipelines: Vec<DiscPipeline>,
    events: mpsc::UnboundedSender<PipelineEvent>,
    worker_tx: mpsc::UnboundedSender<WorkerMessage>,
    worker_rx: mpsc::UnboundedReceiver<WorkerMessage>,
    stop_tx: broadcast::Sender<()>,
    stop_rx: broadcast::Receiver<()>,
}

impl ConversionRunner {
    /// Creates a runner reporting [`PipelineEvent`]s on `events`.
    pub fn new(
        config: RunnerConfig,
        toolkit: Toolkit,
        events: mpsc::UnboundedSender<PipelineEvent>,
    ) -> Self {
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = broadcast::channel(1);

        Self {
            config,
            toolkit,
            pipelines: Vec::new(),
            events,
            worker_tx,
            worker_rx,
            stop_tx,
            stop_rx,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Adds a pipeline converting `tracks` of `disc`.
    ///
    /// The disc's directories are checked right away; nothing runs until
    /// [`run`](Self::run).
    pub fn add_disc(
        &mut self,
        profile: Profile,
        disc: Arc<Disc>,
        tracks: Vec<Track>,
    ) -> Result<PipelineId, PipelineError> {
        let setup = PipelineSetup::new(
            self.toolkit.clone(),
            self.worker_tx.clone(),
            self.events.clone(),
        )
        .with_stop_grace(self.config.stop_grace());

        let pipeline = DiscPipeline::new(profile, disc, tracks, &self.config.work_dir, setup)?;
        let id = pipeline.id();
        info!(pipeline = %id, album = %pipeline.disc().album_title(), "Disc added");
        self.pipelines.push(pipeline);
        Ok(id)
    }

    /// Adds a pipeline converting every track of `disc`.
    pub fn add_whole_disc(
        &mut self,
        profile: Profile,
        disc: Disc,
    ) -> Result<PipelineId, PipelineError> {
        let tracks = disc.tracks.clone();
        self.add_disc(profile, Arc::new(disc), tracks)
    }

    pub fn disc_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Slots left after subtracting every live worker from the configured
    /// limits.
    pub fn free_slots(&self) -> Slots {
        let running = |kind| {
            self.pipelines
                .iter()
                .map(|p| p.running_thread_count(kind))
                .sum::<usize>()
        };
        Slots::new(
            self.config
                .max_parallel_splits
                .saturating_sub(running(WorkerKind::Split)),
            self.config
                .max_parallel_encodes
                .saturating_sub(running(WorkerKind::Encode)),
        )
    }

    /// Runs until every disc has finished, successfully or not.
    pub async fn run(mut self) -> RunSummary {
        info!(discs = self.pipelines.len(), "Conversion started");
        let mut stop_open = true;

        self.schedule_all();
        while !self.all_finished() {
            tokio::select! {
                biased;

                stopped = self.stop_rx.recv(), if stop_open => match stopped {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        info!("Stop requested, cancelling all discs");
                        for pipeline in &mut self.pipelines {
                            pipeline.stop();
                        }
                        stop_open = false;
                    }
                    Err(broadcast::error::RecvError::Closed) => stop_open = false,
                },
                msg = self.worker_rx.recv() => match msg {
                    Some(msg) => self.route(msg),
                    None => break,
                },
            }
            self.schedule_all();
        }

        let summary = self.summary();
        info!(
            discs = summary.discs.len(),
            failed = summary.failed().count(),
            "Conversion finished"
        );
        summary
    }

    fn route(&mut self, msg: WorkerMessage) {
        match self.pipelines.iter_mut().find(|p| p.id() == msg.pipeline) {
            Some(pipeline) => pipeline.handle_message(msg),
            None => warn!(pipeline = %msg.pipeline, worker = %msg.worker, "Message for unknown pipeline"),
        }
    }

    fn schedule_all(&mut self) {
        let mut slots = self.free_slots();
        for pipeline in &mut self.pipelines {
            if slots.encode == 0 {
                break;
            }
            pipeline.schedule(&mut slots);
        }
        debug!(split = slots.split, encode = slots.encode, "Slots left after scheduling");
    }

    fn all_finished(&self) -> bool {
        self.pipelines.iter().all(|p| p.is_finished())
    }

    fn summary(&self) -> RunSummary {
        let discs = self
            .pipelines
            .iter()
            .map(|p| {
                let tracks = p.track_states();
                DiscSummary {
                    pipeline: p.id(),
                    album: p.disc().album_title(),
                    success: !p.is_interrupted()
                        && tracks.iter().all(|(_, s)| *s == TrackState::Ok),
                    tracks,
                }
            })
            .collect();
        RunSummary { discs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::OutputFormat;
    use crate::testing::{fixtures, MockToolkit};
    use tempfile::TempDir;

    fn config(work: &TempDir, splits: usize, encodes: usize) -> RunnerConfig {
        RunnerConfig::default()
            .with_parallelism(splits, encodes)
            .with_work_dir(work.path().join("work"))
            .with_stop_grace_ms(200)
    }

    #[tokio::test]
    async fn test_run_without_discs_finishes() {
        let work = TempDir::new().unwrap();
        let mock = MockToolkit::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let runner = ConversionRunner::new(config(&work, 1, 1), mock.toolkit(), tx);

        let summary = runner.run().await;
        assert!(summary.discs.is_empty());
        assert!(summary.success());
    }

    #[tokio::test]
    async fn test_free_slots_before_run() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let mock = MockToolkit::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut runner = ConversionRunner::new(config(&work, 2, 3), mock.toolkit(), tx);

        let disc = fixtures::disc(out.path(), 2, "flac");
        runner
            .add_whole_disc(Profile::new(OutputFormat::Flac), disc)
            .unwrap();

        assert_eq!(runner.disc_count(), 1);
        assert_eq!(runner.free_slots(), Slots::new(2, 3));
    }

    #[tokio::test]
    async fn test_two_discs_share_slots() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let mock = MockToolkit::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut runner = ConversionRunner::new(config(&work, 1, 2), mock.toolkit(), tx);

        for name in ["a", "b"] {
            let disc = fixtures::disc(&out.path().join(name), 3, "flac");
            runner
                .add_whole_disc(Profile::new(OutputFormat::Flac), disc)
                .unwrap();
        }

        let summary = runner.run().await;
        assert_eq!(summary.discs.len(), 2);
        assert!(summary.success());
        assert_eq!(mock.journal().finalized().len(), 6);
        assert!(mock.max_concurrent_encodes() <= 2);
    }
}
