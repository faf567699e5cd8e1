//! Disc pipeline lifecycle integration tests.
//!
//! These tests drive a single pipeline through its track states with mock
//! collaborators:
//! not_running -> splitting -> queued -> encoding -> [wait/calc/write gain] -> ok

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use discoder_core::{
    gain::AlbumGain,
    testing::{fixtures, JournalEntry, MockToolkit},
    worker::WorkerKind,
    CoverMode, CoverOptions, CueOptions, Disc, DiscPipeline, GainMode, OutputFormat,
    PipelineError, PipelineEvent, PipelineSetup, PregapMode, Profile, ReplayGain, Slots,
    TrackState, WorkerMessage,
};

/// Test helper owning the mocks, channels and directories of one pipeline.
struct TestHarness {
    mock: MockToolkit,
    worker_tx: mpsc::UnboundedSender<WorkerMessage>,
    worker_rx: mpsc::UnboundedReceiver<WorkerMessage>,
    events_tx: mpsc::UnboundedSender<PipelineEvent>,
    events_rx: mpsc::UnboundedReceiver<PipelineEvent>,
    events: Vec<PipelineEvent>,
    work_dir: TempDir,
    out_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            mock: MockToolkit::new(),
            worker_tx,
            worker_rx,
            events_tx,
            events_rx,
            events: Vec::new(),
            work_dir: TempDir::new().expect("Failed to create work dir"),
            out_dir: TempDir::new().expect("Failed to create output dir"),
        }
    }

    fn disc(&self, tracks: usize) -> Disc {
        fixtures::disc(self.out_dir.path(), tracks, "flac")
    }

    fn pipeline(&self, profile: Profile, disc: Disc) -> DiscPipeline {
        let tracks = disc.tracks.clone();
        self.try_pipeline(profile, disc, tracks)
            .expect("Failed to create pipeline")
    }

    fn try_pipeline(
        &self,
        profile: Profile,
        disc: Disc,
        tracks: Vec<discoder_core::Track>,
    ) -> Result<DiscPipeline, PipelineError> {
        let setup = PipelineSetup::new(
            self.mock.toolkit(),
            self.worker_tx.clone(),
            self.events_tx.clone(),
        )
        .with_stop_grace(Duration::from_millis(200));
        DiscPipeline::new(profile, Arc::new(disc), tracks, self.work_dir.path(), setup)
    }

    /// Runs `pipeline` with the given limits until it has finished.
    async fn drive(&mut self, pipeline: &mut DiscPipeline, limits: Slots) {
        self.drive_until(pipeline, limits, |p| p.is_finished()).await;
    }

    /// Runs `pipeline` with the given limits until `done` holds.
    async fn drive_until(
        &mut self,
        pipeline: &mut DiscPipeline,
        limits: Slots,
        done: impl Fn(&DiscPipeline) -> bool,
    ) {
        loop {
            let mut slots = Slots::new(
                limits.split - pipeline.running_thread_count(WorkerKind::Split),
                limits.encode - pipeline.running_thread_count(WorkerKind::Encode),
            );
            pipeline.schedule(&mut slots);
            if done(pipeline) {
                break;
            }

            let msg = tokio::time::timeout(Duration::from_secs(10), self.worker_rx.recv())
                .await
                .expect("Pipeline stalled")
                .expect("Worker channel closed");
            pipeline.handle_message(msg);
        }
        self.collect_events();
    }

    fn collect_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.events.push(event);
        }
    }

    fn finished_events(&self) -> Vec<bool> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Finished { success, .. } => Some(*success),
                _ => None,
            })
            .collect()
    }

    fn first_state_event(&self, track: usize, state: TrackState) -> Option<usize> {
        self.events.iter().position(|e| {
            matches!(e, PipelineEvent::TrackProgress { track: t, state: s, .. } if *t == track && *s == state)
        })
    }
}

#[tokio::test]
async fn test_disc_without_gain_converts_every_track() {
    let mut harness = TestHarness::new();
    let disc = harness.disc(3);
    let mut pipeline = harness.pipeline(Profile::new(OutputFormat::Flac), disc);

    harness.drive(&mut pipeline, Slots::new(1, 2)).await;

    assert!(!pipeline.is_running());
    for (_, state) in pipeline.track_states() {
        assert_eq!(state, TrackState::Ok);
    }
    assert_eq!(harness.finished_events(), vec![true]);
    assert_eq!(harness.mock.journal().finalized().len(), 3);
    assert!(harness.mock.journal().album_gains().is_empty());
    assert!(harness.mock.max_concurrent_encodes() <= 2);
}

#[tokio::test]
async fn test_every_track_splits_before_encoding() {
    let mut harness = TestHarness::new();
    let disc = harness.disc(3);
    let mut pipeline = harness.pipeline(Profile::new(OutputFormat::Flac), disc);

    harness.drive(&mut pipeline, Slots::new(1, 3)).await;

    for track in 0..3 {
        let splitting = harness.first_state_event(track, TrackState::Splitting).unwrap();
        let queued = harness.first_state_event(track, TrackState::Queued).unwrap();
        let encoding = harness.first_state_event(track, TrackState::Encoding).unwrap();
        let ok = harness.first_state_event(track, TrackState::Ok).unwrap();
        assert!(splitting < queued);
        assert!(queued < encoding);
        assert!(encoding < ok);
    }
}

#[tokio::test]
async fn test_album_gain_waits_for_every_track() {
    let mut harness = TestHarness::new();
    let gains = [
        ReplayGain::new(-4.0, 0.7),
        ReplayGain::new(-8.0, 0.99),
        ReplayGain::new(-6.0, 0.8),
    ];
    for (track, gain) in gains.iter().enumerate() {
        harness.mock.encoder.set_gain(track, *gain);
    }
    harness.mock.splitter.set_order(vec![1, 2, 0]);

    let disc = harness.disc(3);
    let profile = Profile::new(OutputFormat::Flac).with_gain_mode(GainMode::Album);
    let mut pipeline = harness.pipeline(profile, disc);

    harness.drive(&mut pipeline, Slots::new(1, 1)).await;

    let journal = harness.mock.journal();
    assert_eq!(journal.encodes_started(), vec![1, 2, 0]);

    // No album value is written before the last track's encode reports
    let last_encode = journal
        .position(|e| matches!(e, JournalEntry::EncodeFinished { track: 0 }))
        .unwrap();
    let album_writes =
        journal.positions(|e| matches!(e, JournalEntry::AlbumGainWritten { .. }));
    assert_eq!(album_writes.len(), 3);
    assert!(album_writes.iter().all(|pos| *pos > last_encode));

    let track_writes =
        journal.positions(|e| matches!(e, JournalEntry::TrackGainWritten { .. }));
    assert_eq!(track_writes.len(), 3);

    // Every file got the same album value, combined from all three tracks
    let expected = AlbumGain::combine(&gains);
    for (_, gain) in journal.album_gains() {
        assert_eq!(gain, expected);
    }
    assert_eq!(expected.peak, 0.99);

    let finalizes = journal.positions(|e| matches!(e, JournalEntry::Finalized { .. }));
    assert_eq!(finalizes.len(), 3);
    assert!(finalizes.iter().all(|pos| *pos > last_encode));

    for track in 0..3 {
        assert!(harness.first_state_event(track, TrackState::CalcGain).is_some());
        assert_eq!(pipeline.track_state(track), Some(TrackState::Ok));
    }
    assert_eq!(harness.finished_events(), vec![true]);
}

#[tokio::test]
async fn test_track_gain_mode_finalizes_without_waiting() {
    let mut harness = TestHarness::new();
    harness.mock.encoder.block_on(2);

    let disc = harness.disc(3);
    let profile = Profile::new(OutputFormat::Flac).with_gain_mode(GainMode::Track);
    let mut pipeline = harness.pipeline(profile, disc);

    harness
        .drive_until(&mut pipeline, Slots::new(1, 3), |p| {
            p.track_state(0) == Some(TrackState::Ok) && p.track_state(1) == Some(TrackState::Ok)
        })
        .await;

    assert_eq!(harness.mock.journal().finalized().len(), 2);
    assert!(harness.mock.journal().album_gains().is_empty());

    pipeline.stop();
    assert_eq!(pipeline.track_state(2), Some(TrackState::Canceled));
}

#[tokio::test]
async fn test_missing_gain_fails_track() {
    let mut harness = TestHarness::new();
    harness.mock.encoder.omit_gain();

    let disc = harness.disc(1);
    let profile = Profile::new(OutputFormat::Flac).with_gain_mode(GainMode::Track);
    let mut pipeline = harness.pipeline(profile, disc);

    harness.drive(&mut pipeline, Slots::new(1, 1)).await;

    assert_eq!(pipeline.track_state(0), Some(TrackState::Error));
    assert_eq!(harness.finished_events(), vec![false]);
}

#[tokio::test]
async fn test_multichannel_disables_gain() {
    let harness = TestHarness::new();
    let mut disc = harness.disc(2);
    disc.tracks[1].channels = 6;

    let profile = Profile::new(OutputFormat::Flac).with_gain_mode(GainMode::Album);
    let pipeline = harness.pipeline(profile, disc);

    assert_eq!(pipeline.profile().gain_mode, GainMode::Disable);
}

#[tokio::test]
async fn test_schedule_needs_encode_slots() {
    let harness = TestHarness::new();
    let disc = harness.disc(2);
    let mut pipeline = harness.pipeline(Profile::new(OutputFormat::Flac), disc);

    let mut slots = Slots::new(2, 0);
    pipeline.schedule(&mut slots);
    assert_eq!(slots, Slots::new(2, 0));
    assert_eq!(pipeline.running_thread_count(WorkerKind::Split), 0);
    assert_eq!(pipeline.track_state(0), Some(TrackState::NotRunning));

    let mut slots = Slots::new(0, 5);
    pipeline.schedule(&mut slots);
    assert_eq!(slots, Slots::new(0, 5));
    assert_eq!(pipeline.running_thread_count(WorkerKind::Split), 0);
    assert_eq!(pipeline.track_state(1), Some(TrackState::NotRunning));

    let mut slots = Slots::new(2, 5);
    pipeline.schedule(&mut slots);
    assert_eq!(slots, Slots::new(1, 5));
    assert_eq!(pipeline.running_thread_count(WorkerKind::Split), 1);
    assert_eq!(pipeline.track_state(0), Some(TrackState::Splitting));
    assert_eq!(pipeline.track_state(1), Some(TrackState::Splitting));

    pipeline.stop();
}

#[tokio::test]
async fn test_encode_error_aborts_other_tracks() {
    let mut harness = TestHarness::new();
    harness.mock.encoder.block_on(0);
    harness.mock.encoder.block_on(2);
    harness.mock.encoder.fail_on(1);

    let disc = harness.disc(3);
    let mut pipeline = harness.pipeline(Profile::new(OutputFormat::Flac), disc);

    harness.drive(&mut pipeline, Slots::new(1, 3)).await;

    assert_eq!(pipeline.track_state(1), Some(TrackState::Error));
    assert_eq!(pipeline.track_state(0), Some(TrackState::Aborted));
    assert_eq!(pipeline.track_state(2), Some(TrackState::Aborted));
    assert!(pipeline.is_interrupted());
    assert!(harness.mock.journal().finalized().is_empty());

    // Late worker reports change nothing
    tokio::time::sleep(Duration::from_millis(100)).await;
    while let Ok(msg) = harness.worker_rx.try_recv() {
        pipeline.handle_message(msg);
    }
    harness.collect_events();

    assert_eq!(pipeline.track_state(0), Some(TrackState::Aborted));
    assert_eq!(harness.finished_events(), vec![false]);

    let error = harness
        .events
        .iter()
        .position(|e| matches!(e, PipelineEvent::Error { track: 1, .. }))
        .unwrap();
    let finished = harness
        .events
        .iter()
        .position(|e| matches!(e, PipelineEvent::Finished { .. }))
        .unwrap();
    assert!(error < finished);
}

#[tokio::test]
async fn test_split_error_aborts_disc() {
    let mut harness = TestHarness::new();
    harness.mock.splitter.fail_on(1);

    let disc = harness.disc(3);
    let mut pipeline = harness.pipeline(Profile::new(OutputFormat::Flac), disc);

    harness.drive(&mut pipeline, Slots::new(1, 1)).await;

    assert_eq!(pipeline.track_state(1), Some(TrackState::Error));
    assert_eq!(pipeline.track_state(2), Some(TrackState::Aborted));
    assert_eq!(harness.finished_events(), vec![false]);
}

#[tokio::test]
async fn test_stop_keeps_finished_tracks() {
    let mut harness = TestHarness::new();
    harness.mock.encoder.block_on(1);
    harness.mock.encoder.block_on(2);

    let disc = harness.disc(4);
    let mut pipeline = harness.pipeline(Profile::new(OutputFormat::Flac), disc);

    harness
        .drive_until(&mut pipeline, Slots::new(1, 2), |p| {
            p.track_state(0) == Some(TrackState::Ok) && p.pending_encodes() > 0
        })
        .await;

    pipeline.stop();
    harness.collect_events();

    assert_eq!(pipeline.track_state(0), Some(TrackState::Ok));
    for track in 1..4 {
        assert_eq!(pipeline.track_state(track), Some(TrackState::Canceled));
    }
    assert_eq!(pipeline.pending_encodes(), 0);
    assert_eq!(harness.finished_events(), vec![false]);

    // Stopping twice does not report again
    pipeline.stop();
    harness.collect_events();
    assert_eq!(harness.finished_events(), vec![false]);
}

#[tokio::test]
async fn test_finalize_failure_aborts_disc() {
    let mut harness = TestHarness::new();
    let disc = harness.disc(3);
    harness
        .mock
        .finalizer
        .fail_on(disc.tracks[1].result_path.clone());

    let mut pipeline = harness.pipeline(Profile::new(OutputFormat::Flac), disc);

    harness.drive(&mut pipeline, Slots::new(1, 1)).await;

    assert_eq!(pipeline.track_state(0), Some(TrackState::Ok));
    assert_eq!(pipeline.track_state(1), Some(TrackState::Error));
    assert_eq!(pipeline.track_state(2), Some(TrackState::Aborted));
    assert_eq!(harness.finished_events(), vec![false]);
}

#[tokio::test]
async fn test_tag_write_failure_aborts_disc() {
    let mut harness = TestHarness::new();
    harness.mock.tag_writers.set_fail_saves(true);

    let disc = harness.disc(2);
    let profile = Profile::new(OutputFormat::Flac).with_gain_mode(GainMode::Album);
    let mut pipeline = harness.pipeline(profile, disc);

    harness.drive(&mut pipeline, Slots::new(1, 1)).await;

    let states: Vec<TrackState> = pipeline.track_states().into_iter().map(|(_, s)| s).collect();
    assert!(states.contains(&TrackState::Error));
    assert!(states.iter().all(|s| *s != TrackState::Ok));
    assert!(harness.mock.journal().finalized().is_empty());
}

#[tokio::test]
async fn test_pregap_extracted_when_cue_created() {
    let mut harness = TestHarness::new();
    let disc = fixtures::disc_with_pregap(harness.out_dir.path(), 2, "flac");
    let profile = Profile::new(OutputFormat::Flac).with_cue(CueOptions {
        create: true,
        pregap: PregapMode::ExtractToFile,
        ..Default::default()
    });
    let mut pipeline = harness.pipeline(profile, disc);

    harness.drive(&mut pipeline, Slots::new(1, 1)).await;

    let journal = harness.mock.journal();
    assert!(journal.position(|e| *e == JournalEntry::PregapReady).is_some());
    assert!(journal
        .finalized()
        .contains(&harness.out_dir.path().join("pregap.wav")));

    let cue = std::fs::read_to_string(harness.out_dir.path().join("disc.cue")).unwrap();
    assert!(cue.contains("pregap.wav"));
    assert!(cue.contains("01 - Track 1.flac"));
}

#[tokio::test]
async fn test_pregap_skipped_when_first_track_starts_at_zero() {
    let mut harness = TestHarness::new();
    let disc = harness.disc(1);
    let profile = Profile::new(OutputFormat::Flac).with_cue(CueOptions {
        create: true,
        pregap: PregapMode::ExtractToFile,
        ..Default::default()
    });
    let mut pipeline = harness.pipeline(profile, disc);

    harness.drive(&mut pipeline, Slots::new(1, 1)).await;

    assert!(harness
        .mock
        .journal()
        .position(|e| *e == JournalEntry::PregapReady)
        .is_none());
    assert_eq!(pipeline.track_state(0), Some(TrackState::Ok));
}

#[tokio::test]
async fn test_pregap_skipped_without_first_track() {
    let mut harness = TestHarness::new();
    let disc = fixtures::disc_with_pregap(harness.out_dir.path(), 3, "flac");
    let tracks = disc.tracks[1..].to_vec();
    let profile = Profile::new(OutputFormat::Flac).with_cue(CueOptions {
        create: true,
        pregap: PregapMode::ExtractToFile,
        ..Default::default()
    });
    let mut pipeline = harness.try_pipeline(profile, disc, tracks).unwrap();

    harness.drive(&mut pipeline, Slots::new(1, 2)).await;

    let journal = harness.mock.journal();
    assert!(journal.position(|e| *e == JournalEntry::PregapReady).is_none());
    assert!(journal
        .position(|e| *e == JournalEntry::SplitStarted { tracks: vec![1, 2] })
        .is_some());
    assert_eq!(pipeline.track_state(0), None);
}

#[tokio::test]
async fn test_files_land_in_place() {
    let mut harness = TestHarness::new();
    harness.mock.finalizer.set_passthrough(true);

    let mut disc = harness.disc(2);
    let cover = harness.work_dir.path().join("front.png");
    std::fs::write(&cover, b"\x89PNG\r\n\x1a\nrest").unwrap();
    disc.cover_image = Some(cover);

    let orig = CoverOptions {
        mode: CoverMode::OrigSize,
        size: 0,
    };
    let profile = Profile::new(OutputFormat::Flac).with_covers(orig, orig);
    let mut pipeline = harness.pipeline(profile, disc.clone());

    harness.drive(&mut pipeline, Slots::new(1, 2)).await;

    for track in &disc.tracks {
        let data = std::fs::read(&track.result_path).unwrap();
        assert_eq!(data, b"encoded");
    }
    assert!(harness.out_dir.path().join("cover.png").exists());
    assert!(pipeline.temp_dir().join("cover.png").exists());
}

#[tokio::test]
async fn test_missing_cover_aborts_disc() {
    let mut harness = TestHarness::new();
    let mut disc = harness.disc(3);
    disc.cover_image = Some(harness.work_dir.path().join("missing.jpg"));

    let copy = CoverOptions {
        mode: CoverMode::OrigSize,
        size: 0,
    };
    let profile = Profile::new(OutputFormat::Flac).with_covers(copy, CoverOptions::default());
    let mut pipeline = harness.pipeline(profile, disc);

    harness.drive(&mut pipeline, Slots::new(1, 2)).await;

    assert_eq!(pipeline.track_state(0), Some(TrackState::Error));
    assert_eq!(pipeline.track_state(1), Some(TrackState::Aborted));
    assert_eq!(pipeline.track_state(2), Some(TrackState::Aborted));
    assert_eq!(pipeline.running_thread_count(WorkerKind::Split), 0);
    assert_eq!(harness.finished_events(), vec![false]);
    assert!(harness
        .events
        .iter()
        .any(|e| matches!(e, PipelineEvent::Error { track: 0, .. })));
    assert!(harness.mock.journal().encodes_started().is_empty());
}

#[tokio::test]
async fn test_unrecognized_cover_aborts_disc() {
    let mut harness = TestHarness::new();
    let mut disc = harness.disc(2);
    let cover = harness.work_dir.path().join("front.jpg");
    std::fs::write(&cover, b"not an image").unwrap();
    disc.cover_image = Some(cover);

    let embed = CoverOptions {
        mode: CoverMode::OrigSize,
        size: 0,
    };
    let profile = Profile::new(OutputFormat::Flac).with_covers(CoverOptions::default(), embed);
    let mut pipeline = harness.pipeline(profile, disc);

    harness.drive(&mut pipeline, Slots::new(1, 2)).await;

    assert_eq!(pipeline.track_state(0), Some(TrackState::Error));
    assert_eq!(pipeline.track_state(1), Some(TrackState::Aborted));
    assert_eq!(harness.finished_events(), vec![false]);
}

#[tokio::test]
async fn test_duplicate_track_index_is_rejected() {
    let harness = TestHarness::new();
    let disc = harness.disc(2);
    let mut tracks = disc.tracks.clone();
    tracks[1].index = 0;

    let result = harness.try_pipeline(Profile::new(OutputFormat::Flac), disc, tracks);
    assert!(matches!(result, Err(PipelineError::DuplicateTrack(0))));
}

#[cfg(unix)]
#[tokio::test]
async fn test_read_only_output_dir_is_rejected() {
    use std::os::unix::fs::PermissionsExt;

    let harness = TestHarness::new();
    let locked = harness.out_dir.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

    // Privileged users write through the mode bits
    if tempfile::NamedTempFile::new_in(&locked).is_ok() {
        return;
    }

    let mut disc = harness.disc(1);
    disc.tracks[0].result_path = locked.join("01.flac");
    let tracks = disc.tracks.clone();

    let result = harness.try_pipeline(Profile::new(OutputFormat::Flac), disc, tracks);
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    match result {
        Err(PipelineError::DirectoryNotWritable { path, .. }) => assert_eq!(path, locked),
        other => panic!("expected DirectoryNotWritable, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_uncreatable_output_dir_is_rejected() {
    let harness = TestHarness::new();
    let blocker = harness.out_dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();

    let mut disc = harness.disc(1);
    disc.tracks[0].result_path = blocker.join("01.flac");
    let tracks = disc.tracks.clone();

    let result = harness.try_pipeline(Profile::new(OutputFormat::Flac), disc, tracks);
    assert!(matches!(
        result,
        Err(PipelineError::DirectoryNotCreatable { .. })
    ));
}

#[tokio::test]
async fn test_empty_track_list_is_rejected() {
    let harness = TestHarness::new();
    let disc = harness.disc(1);

    let result = harness.try_pipeline(Profile::new(OutputFormat::Flac), disc, Vec::new());
    assert!(matches!(result, Err(PipelineError::EmptyTrackList)));
}
