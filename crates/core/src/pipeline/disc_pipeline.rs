//! The per-disc orchestrator.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::PipelineError;
use super::toolkit::Toolkit;
use super::types::{EncodeRequest, GainRecord, PipelineEvent, Slots, SplitRequest, TrackState};
use crate::disc::{CoverImage, CueCreator, Disc, Track, PREGAP_FILE_NAME};
use crate::encoder::{EncodeJob, EncodeWorker};
use crate::gain::{AlbumGain, ReplayGain};
use crate::metrics;
use crate::profile::{CoverOptions, GainMode, PregapMode, Profile};
use crate::splitter::{SplitJob, SplitWorker};
use crate::tags::TrackMetadata;
use crate::worker::{
    PipelineId, Worker, WorkerEvent, WorkerId, WorkerKind, WorkerMessage, WorkerThread,
    DEFAULT_STOP_GRACE,
};

/// How a pipeline is wired to its surroundings.
#[derive(Clone)]
pub struct PipelineSetup {
    pub toolkit: Toolkit,
    /// Channel every worker of this pipeline reports on.
    pub worker_tx: mpsc::UnboundedSender<WorkerMessage>,
    /// Channel receiving [`PipelineEvent`]s.
    pub events: mpsc::UnboundedSender<PipelineEvent>,
    /// Grace period for each step of worker thread teardown.
    pub stop_grace: Duration,
}

impl PipelineSetup {
    pub fn new(
        toolkit: Toolkit,
        worker_tx: mpsc::UnboundedSender<WorkerMessage>,
        events: mpsc::UnboundedSender<PipelineEvent>,
    ) -> Self {
        Self {
            toolkit,
            worker_tx,
            events,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }
}

struct TrackEntry {
    track: Track,
    state: TrackState,
    percent: u8,
}

/// Converts the selected tracks of one disc.
pub struct DiscPipeline {
    id: PipelineId,
    profile: Profile,
    disc: Arc<Disc>,
    tracks: Vec<TrackEntry>,
    setup: PipelineSetup,
    temp_dir: TempDir,
    pregap: PregapMode,

    split_queue: VecDeque<SplitRequest>,
    encode_queue: VecDeque<EncodeRequest>,
    gain_records: Vec<GainRecord>,
    album_gain: AlbumGain,

    threads: HashMap<WorkerId, WorkerThread>,
    next_worker: u64,

    embedded_cue: Option<String>,
    embedded_cover: Option<PathBuf>,

    interrupted: bool,
    finished: bool,
}

impl DiscPipeline {
    /// Prepares a pipeline for `tracks` of `disc`.
    ///
    /// Creates `work_dir` and every output directory, and a temporary
    /// directory inside `work_dir` for intermediate files. Nothing is
    /// started until [`schedule`](Self::schedule) is called.
    pub fn new(
        profile: Profile,
        disc: Arc<Disc>,
        tracks: Vec<Track>,
        work_dir: &Path,
        setup: PipelineSetup,
    ) -> Result<Self, PipelineError> {
        if tracks.is_empty() {
            return Err(PipelineError::EmptyTrackList);
        }
        let mut seen = HashSet::new();
        if let Some(track) = tracks.iter().find(|t| !seen.insert(t.index)) {
            return Err(PipelineError::DuplicateTrack(track.index));
        }

        let id = PipelineId::new();
        debug!(pipeline = %id, work_dir = %work_dir.display(), "Creating pipeline");

        ensure_dir(work_dir)?;
        for track in &tracks {
            ensure_dir(track.result_dir())?;
        }

        let temp_dir = tempfile::Builder::new()
            .prefix("tmp")
            .tempdir_in(work_dir)
            .map_err(|source| PipelineError::TempDir {
                path: work_dir.to_path_buf(),
                source,
            })?;

        let mut profile = profile;
        if profile.gain_mode != GainMode::Disable && tracks.iter().any(|t| t.channels > 2) {
            warn!(pipeline = %id, "Multichannel audio, replay gain disabled");
            profile.gain_mode = GainMode::Disable;
        }

        let has_pregap = tracks[0].index == 0 && !tracks[0].index01.is_zero();
        let pregap = if has_pregap && profile.cue.create {
            profile.cue.pregap
        } else {
            PregapMode::Skip
        };

        let split = SplitRequest {
            tracks: tracks.iter().map(|t| t.index).collect(),
            out_dir: temp_dir.path().to_path_buf(),
            pregap,
        };

        let album_gain = AlbumGain::new(tracks.len());
        let tracks = tracks
            .into_iter()
            .map(|track| TrackEntry {
                track,
                state: TrackState::NotRunning,
                percent: 0,
            })
            .collect();

        Ok(Self {
            id,
            profile,
            disc,
            tracks,
            setup,
            temp_dir,
            pregap,
            split_queue: VecDeque::from([split]),
            encode_queue: VecDeque::new(),
            gain_records: Vec::new(),
            album_gain,
            threads: HashMap::new(),
            next_worker: 0,
            embedded_cue: None,
            embedded_cover: None,
            interrupted: false,
            finished: false,
        })
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn disc(&self) -> &Disc {
        &self.disc
    }

    /// The profile in effect, after any replay-gain downgrade.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Current state of track `index`, if it belongs to this run.
    pub fn track_state(&self, index: usize) -> Option<TrackState> {
        self.position(index).map(|pos| self.tracks[pos].state)
    }

    pub fn track_states(&self) -> Vec<(usize, TrackState)> {
        self.tracks
            .iter()
            .map(|e| (e.track.index, e.state))
            .collect()
    }

    pub fn pending_encodes(&self) -> usize {
        self.encode_queue.len()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Whether the finished event has been sent.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True while any track is in a transient state.
    pub fn is_running(&self) -> bool {
        self.tracks.iter().any(|e| !e.state.is_terminal())
    }

    /// Workers of `kind` that have not reported `Finished` yet.
    pub fn running_thread_count(&self, kind: WorkerKind) -> usize {
        self.threads.values().filter(|t| t.kind() == kind).count()
    }

    /// Starts as much queued work as `slots` allow and takes the used slots.
    ///
    /// Does nothing once interrupted or without encode slots. Zero split
    /// slots only hold back splits: queued encodes still start, since the
    /// encode count is the overall gate. A queued split takes precedence:
    /// when one is started the call returns right away. Otherwise queued
    /// encodes are started while encode slots last.
    pub fn schedule(&mut self, slots: &mut Slots) {
        if self.interrupted || slots.encode == 0 {
            return;
        }

        if slots.split > 0 {
            if let Some(request) = self.split_queue.pop_front() {
                slots.split -= 1;
                self.start_splitter(request);
                return;
            }
        }

        while slots.encode > 0 && !self.interrupted {
            let Some(request) = self.encode_queue.pop_front() else {
                break;
            };
            slots.encode -= 1;
            self.start_encoder(request);
        }
    }

    /// Applies one worker message. Messages from other pipelines are ignored.
    pub fn handle_message(&mut self, msg: WorkerMessage) {
        if msg.pipeline != self.id {
            return;
        }

        if msg.event == WorkerEvent::Finished {
            if let Some(thread) = self.threads.remove(&msg.worker) {
                thread.shutdown();
            }
            return;
        }

        if self.interrupted {
            debug!(pipeline = %self.id, worker = %msg.worker, "Ignoring event after interrupt");
            return;
        }

        match msg.event {
            WorkerEvent::Progress { track, percent } => {
                let state = match msg.kind {
                    WorkerKind::Split => TrackState::Splitting,
                    WorkerKind::Encode => TrackState::Encoding,
                };
                if let Some(pos) = self.position(track) {
                    self.set_state(pos, state, percent);
                }
            }
            WorkerEvent::SplitReady { track, file } => {
                let Some(pos) = self.position(track) else {
                    warn!(pipeline = %self.id, track, "Split reported an unknown track");
                    return;
                };
                debug!(pipeline = %self.id, track, file = %file.display(), "Track split");
                self.encode_queue.push_back(EncodeRequest { track, input: file });
                self.set_state(pos, TrackState::Queued, 0);
            }
            WorkerEvent::PregapReady { file } => self.pregap_done(&file),
            WorkerEvent::EncodeReady { track, file, gain } => {
                let Some(pos) = self.position(track) else {
                    warn!(pipeline = %self.id, track, "Encoder reported an unknown track");
                    return;
                };
                match self.profile.gain_mode {
                    GainMode::Disable => self.track_done(pos, &file),
                    GainMode::Track | GainMode::Album => match gain {
                        Some(gain) => self.write_gain(pos, file, gain),
                        None => self.track_error(pos, "Replay gain was not measured".to_string()),
                    },
                }
            }
            WorkerEvent::Error { track, message } => {
                let pos = self.position(track).unwrap_or(0);
                self.track_error(pos, message);
            }
            WorkerEvent::Finished => {}
        }
    }

    /// Cancels the run: pending work is dropped, every worker is told to
    /// stop and the run is reported finished. Tracks already `Ok` stay `Ok`.
    pub fn stop(&mut self) {
        info!(pipeline = %self.id, "Stopping pipeline");
        self.interrupt(TrackState::Canceled);
        self.stop_threads();
        self.emit_finished();
    }

    fn position(&self, index: usize) -> Option<usize> {
        self.tracks.iter().position(|e| e.track.index == index)
    }

    fn next_worker_id(&mut self) -> WorkerId {
        self.next_worker += 1;
        WorkerId(self.next_worker)
    }

    fn spawn(&mut self, worker: Box<dyn Worker>) -> std::io::Result<()> {
        let id = self.next_worker_id();
        let thread = WorkerThread::spawn(
            worker,
            self.id,
            id,
            self.setup.worker_tx.clone(),
            self.setup.stop_grace,
        )?;
        self.threads.insert(id, thread);
        Ok(())
    }

    fn start_splitter(&mut self, request: SplitRequest) {
        let tracks: Vec<Track> = request
            .tracks
            .iter()
            .filter_map(|index| self.position(*index))
            .map(|pos| self.tracks[pos].track.clone())
            .collect();

        let job = SplitJob {
            audio_file: self.disc.audio_file.clone(),
            tracks,
            out_dir: request.out_dir,
            pregap: request.pregap,
        };
        info!(pipeline = %self.id, tracks = job.tracks.len(), pregap = ?job.pregap, "Starting split");

        let worker = SplitWorker::new(self.setup.toolkit.splitter.clone(), job);
        if let Err(e) = self.spawn(Box::new(worker)) {
            self.track_error(0, format!("Failed to start split thread: {}", e));
            return;
        }

        for pos in 0..self.tracks.len() {
            self.set_state(pos, TrackState::Splitting, 0);
        }

        // Short tasks that do not get a thread of their own
        if let Err(message) = self.prepare_disc_files() {
            self.track_error(0, message);
        }
    }

    fn prepare_disc_files(&mut self) -> Result<(), String> {
        let first_dir = self.tracks[0].track.result_dir().to_path_buf();

        if let Some(image) = self.load_cover(self.profile.copy_cover)? {
            let dest = first_dir.join(format!("cover.{}", image.extension()));
            self.setup
                .toolkit
                .covers
                .save_as(&image, &dest)
                .map_err(|e| e.to_string())?;
        }

        if let Some(image) = self.load_cover(self.profile.embed_cover)? {
            let dest = self
                .temp_dir
                .path()
                .join(format!("cover.{}", image.extension()));
            self.setup
                .toolkit
                .covers
                .save_as(&image, &dest)
                .map_err(|e| e.to_string())?;
            self.embedded_cover = Some(dest);
        }

        let tracks: Vec<Track> = self.tracks.iter().map(|e| e.track.clone()).collect();
        let cue = CueCreator::new(&self.disc, &tracks, self.pregap);

        if self.profile.cue.create {
            let path = first_dir.join(&self.profile.cue.file_name);
            cue.write_to_file(&path).map_err(|e| e.to_string())?;
            debug!(pipeline = %self.id, path = %path.display(), "Cue sheet written");
        }

        if self.profile.cue.embed {
            self.embedded_cue = Some(cue.render().map_err(|e| e.to_string())?);
        }

        Ok(())
    }

    fn load_cover(&self, options: CoverOptions) -> Result<Option<CoverImage>, String> {
        if !options.is_enabled() {
            return Ok(None);
        }
        let Some(path) = self.disc.cover_image.as_deref() else {
            return Ok(None);
        };
        let scale = Some(options.scale_size()).filter(|s| *s > 0);
        CoverImage::load(path, scale)
            .map(Some)
            .map_err(|e| e.to_string())
    }

    fn start_encoder(&mut self, request: EncodeRequest) {
        let Some(pos) = self.position(request.track) else {
            return;
        };
        let track = &self.tracks[pos].track;

        let output_path = EncodeJob::temp_output_path(
            self.temp_dir.path(),
            &request.input,
            &track.result_extension(),
        );
        let metadata =
            TrackMetadata::for_track(&self.disc, track).with_cue_sheet(self.embedded_cue.clone());

        let job = EncodeJob {
            track: request.track,
            input_path: request.input,
            output_path,
            profile: self.profile.clone(),
            metadata,
            cover_path: self.embedded_cover.clone(),
            duration_secs: track.duration().map(|d| d.seconds()),
            measure_gain: self.profile.gain_mode != GainMode::Disable,
        };
        debug!(pipeline = %self.id, track = job.track, "Starting encode");

        let worker = EncodeWorker::new(self.setup.toolkit.encoder.clone(), job);
        if let Err(e) = self.spawn(Box::new(worker)) {
            self.track_error(pos, format!("Failed to start encode thread: {}", e));
            return;
        }
        self.set_state(pos, TrackState::Encoding, 0);
    }

    fn write_gain(&mut self, pos: usize, file: PathBuf, gain: ReplayGain) {
        let index = self.tracks[pos].track.index;
        debug!(pipeline = %self.id, track = index, gain = gain.gain_db, peak = gain.peak, "Writing track gain");

        self.set_state(pos, TrackState::WriteGain, 0);
        if let Err(message) = self.save_gain(&file, |w| w.set_track_replay_gain(gain)) {
            self.track_error(pos, message);
            return;
        }

        if self.profile.gain_mode != GainMode::Album {
            self.track_done(pos, &file);
            return;
        }

        self.album_gain.add(gain);
        self.gain_records.push(GainRecord {
            track: index,
            file,
            gain,
        });
        self.set_state(pos, TrackState::WaitGain, 0);

        if self.gain_records.len() < self.tracks.len() {
            return;
        }

        metrics::ALBUM_GAIN_BARRIERS.inc();
        let records = std::mem::take(&mut self.gain_records);
        for record in &records {
            if let Some(pos) = self.position(record.track) {
                self.set_state(pos, TrackState::CalcGain, 0);
            }
        }

        let Some(album) = self.album_gain.result() else {
            self.track_error(pos, "Album gain is incomplete".to_string());
            return;
        };
        info!(pipeline = %self.id, gain = album.gain_db, peak = album.peak, "Album gain calculated");

        for record in records {
            if self.interrupted {
                return;
            }
            let Some(pos) = self.position(record.track) else {
                continue;
            };
            self.set_state(pos, TrackState::WriteGain, 0);
            if let Err(message) = self.save_gain(&record.file, |w| w.set_album_replay_gain(album)) {
                self.track_error(pos, message);
                return;
            }
            self.track_done(pos, &record.file);
        }
    }

    fn save_gain(
        &self,
        file: &Path,
        apply: impl FnOnce(&mut dyn crate::tags::MetadataWriter),
    ) -> Result<(), String> {
        let mut writer = self
            .setup
            .toolkit
            .tag_writers
            .open(self.profile.format, file)
            .map_err(|e| e.to_string())?;
        apply(writer.as_mut());
        writer.save().map_err(|e| e.to_string())
    }

    fn track_done(&mut self, pos: usize, file: &Path) {
        let dest = self.tracks[pos].track.result_path.clone();
        debug!(pipeline = %self.id, track = self.tracks[pos].track.index, dest = %dest.display(), "Finalizing track");

        if let Err(e) = self.setup.toolkit.finalizer.finalize(file, &dest) {
            self.track_error(pos, format!("Cannot move {} to {}: {}", file.display(), dest.display(), e));
            return;
        }

        self.set_state(pos, TrackState::Ok, 100);
        if !self.is_running() {
            self.emit_finished();
        }
    }

    fn pregap_done(&mut self, file: &Path) {
        let dest = self.tracks[0].track.result_dir().join(PREGAP_FILE_NAME);
        if let Err(e) = self.setup.toolkit.finalizer.finalize(file, &dest) {
            self.track_error(0, format!("Cannot move pregap to {}: {}", dest.display(), e));
        }
    }

    fn track_error(&mut self, pos: usize, message: String) {
        let index = self.tracks[pos].track.index;
        warn!(pipeline = %self.id, track = index, error = %message, "Track failed, aborting disc");

        self.set_state(pos, TrackState::Error, 0);
        self.interrupt(TrackState::Aborted);
        self.stop_threads();

        let _ = self.setup.events.send(PipelineEvent::Error {
            pipeline: self.id,
            track: index,
            message,
        });
        self.emit_finished();
    }

    fn interrupt(&mut self, state: TrackState) {
        self.interrupted = true;
        self.split_queue.clear();
        self.encode_queue.clear();
        self.gain_records.clear();
        self.album_gain.clear();

        for pos in 0..self.tracks.len() {
            self.set_state(pos, state, 0);
        }
    }

    fn stop_threads(&mut self) {
        for (_, thread) in self.threads.drain() {
            thread.shutdown();
        }
    }

    fn set_state(&mut self, pos: usize, state: TrackState, percent: u8) {
        let entry = &mut self.tracks[pos];
        if entry.state.is_terminal() || (entry.state == state && entry.percent == percent) {
            return;
        }

        entry.state = state;
        entry.percent = percent;
        if state.is_terminal() {
            metrics::TRACKS_TOTAL.with_label_values(&[state.as_str()]).inc();
        }

        let _ = self.setup.events.send(PipelineEvent::TrackProgress {
            pipeline: self.id,
            track: entry.track.index,
            state,
            percent,
        });
    }

    fn emit_finished(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let success = !self.interrupted && self.tracks.iter().all(|e| e.state == TrackState::Ok);
        metrics::PIPELINES_TOTAL
            .with_label_values(&[if success { "success" } else { "failed" }])
            .inc();
        info!(pipeline = %self.id, success, "Pipeline finished");

        let _ = self.setup.events.send(PipelineEvent::Finished {
            pipeline: self.id,
            success,
        });
    }
}

impl Drop for DiscPipeline {
    fn drop(&mut self) {
        self.stop_threads();
    }
}

/// Creates `dir` if needed and checks that files can be created in it.
fn ensure_dir(dir: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(dir).map_err(|source| PipelineError::DirectoryNotCreatable {
        path: dir.to_path_buf(),
        source,
    })?;
    tempfile::NamedTempFile::new_in(dir)
        .map(drop)
        .map_err(|source| PipelineError::DirectoryNotWritable {
            path: dir.to_path_buf(),
            source,
        })
}
