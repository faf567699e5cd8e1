//! Testing utilities and mock implementations for pipeline tests.
//!
//! Every mock of a [`MockToolkit`] appends to one shared [`Journal`], so
//! tests can assert on the relative order of splits, encodes, tag writes
//! and finalizations.
//!
//! # Example
//!
//! ```rust,ignore
//! use discoder_core::testing::{fixtures, MockToolkit};
//!
//! let mock = MockToolkit::new();
//! mock.splitter.set_order(vec![1, 2, 0]);
//! mock.encoder.fail_on(2);
//!
//! let toolkit = mock.toolkit();
//! // Build a pipeline or runner with `toolkit`...
//!
//! assert_eq!(mock.journal().finalized().len(), 2);
//! ```

mod journal;
mod mock_cover;
mod mock_encoder;
mod mock_finalizer;
mod mock_splitter;
mod mock_tags;

pub use journal::{Journal, JournalEntry};
pub use mock_cover::MockCoverProcessor;
pub use mock_encoder::{MockEncoder, DEFAULT_MOCK_GAIN};
pub use mock_finalizer::MockFinalizer;
pub use mock_splitter::MockSplitter;
pub use mock_tags::{MockMetadataWriter, MockTagWriterFactory};

use std::sync::Arc;
use tokio::sync::watch;

use crate::pipeline::Toolkit;
use crate::worker::StopSignal;

/// One of each mock, sharing a journal.
#[derive(Debug, Clone)]
pub struct MockToolkit {
    journal: Journal,
    pub splitter: Arc<MockSplitter>,
    pub encoder: Arc<MockEncoder>,
    pub tag_writers: Arc<MockTagWriterFactory>,
    pub finalizer: Arc<MockFinalizer>,
    pub covers: Arc<MockCoverProcessor>,
}

impl Default for MockToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolkit {
    pub fn new() -> Self {
        let journal = Journal::new();
        Self {
            splitter: Arc::new(MockSplitter::new(journal.clone())),
            encoder: Arc::new(MockEncoder::new(journal.clone())),
            tag_writers: Arc::new(MockTagWriterFactory::new(journal.clone())),
            finalizer: Arc::new(MockFinalizer::new(journal.clone())),
            covers: Arc::new(MockCoverProcessor::new(journal.clone())),
            journal,
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// A [`Toolkit`] backed by these mocks.
    pub fn toolkit(&self) -> Toolkit {
        Toolkit {
            splitter: self.splitter.clone(),
            encoder: self.encoder.clone(),
            tag_writers: self.tag_writers.clone(),
            finalizer: self.finalizer.clone(),
            covers: self.covers.clone(),
        }
    }

    pub fn max_concurrent_encodes(&self) -> usize {
        self.encoder.max_concurrent()
    }
}

/// Resolves once anything but [`StopSignal::Run`] is signalled, or the
/// sender is gone.
pub(crate) async fn wait_for_stop(mut stop: watch::Receiver<StopSignal>) {
    loop {
        if *stop.borrow_and_update() != StopSignal::Run {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::disc::{CueIndex, Disc, Track, TrackTags};

    /// Length of every fixture track.
    pub const TRACK_MINUTES: u64 = 3;

    /// A track starting at `start`, written to `<out_dir>/NN - Track N.<ext>`.
    pub fn track(out_dir: &Path, index: usize, start: CueIndex, ext: &str) -> Track {
        let number = index as u32 + 1;
        Track {
            index,
            number,
            tags: TrackTags {
                title: Some(format!("Track {}", number)),
                performer: None,
                isrc: None,
            },
            index00: None,
            index01: start,
            end: None,
            result_path: out_dir.join(format!("{:02} - Track {}.{}", number, number, ext)),
            channels: 2,
        }
    }

    /// A disc of `tracks` back-to-back tracks, the first starting at 0.
    pub fn disc(out_dir: &Path, tracks: usize, ext: &str) -> Disc {
        disc_with_offset(out_dir, tracks, ext, CueIndex::ZERO)
    }

    /// Like [`disc`], with two seconds of pregap before the first track.
    pub fn disc_with_pregap(out_dir: &Path, tracks: usize, ext: &str) -> Disc {
        disc_with_offset(out_dir, tracks, ext, CueIndex::from_msf(0, 2, 0))
    }

    fn disc_with_offset(out_dir: &Path, tracks: usize, ext: &str, offset: CueIndex) -> Disc {
        let step = CueIndex::from_msf(TRACK_MINUTES, 0, 0).frames();
        let tracks = (0..tracks)
            .map(|i| {
                let start = CueIndex::from_frames(offset.frames() + step * i as u64);
                track(out_dir, i, start, ext)
            })
            .collect();

        Disc {
            audio_file: out_dir.join("image.flac"),
            title: Some("Test Album".to_string()),
            performer: Some("Test Artist".to_string()),
            genre: None,
            date: Some("1999".to_string()),
            disc_id: None,
            disc_number: 1,
            disc_count: 1,
            cover_image: None,
            tracks,
        }
        .link_tracks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gain::ReplayGain;
    use crate::tags::MetadataWriterFactory;
    use crate::profile::OutputFormat;
    use std::path::Path;

    #[test]
    fn test_fixture_disc_is_linked() {
        let disc = fixtures::disc(Path::new("/out"), 3, "flac");
        assert_eq!(disc.tracks.len(), 3);
        assert_eq!(disc.tracks[0].end, Some(disc.tracks[1].index01));
        assert_eq!(disc.tracks[1].index01.to_string(), "03:00:00");
        assert!(disc.tracks[2].end.is_none());
    }

    #[test]
    fn test_fixture_pregap_offsets_tracks() {
        let disc = fixtures::disc_with_pregap(Path::new("/out"), 2, "flac");
        assert_eq!(disc.tracks[0].index01.to_string(), "00:02:00");
        assert_eq!(disc.tracks[1].index01.to_string(), "03:02:00");
    }

    #[test]
    fn test_tag_writer_journals_on_save_only() {
        let mock = MockToolkit::new();
        let mut writer = mock
            .tag_writers
            .open(OutputFormat::Flac, Path::new("/tmp/a.flac"))
            .unwrap();
        writer.set_album_replay_gain(ReplayGain::new(-7.0, 0.5));
        assert!(mock.journal().album_gains().is_empty());

        writer.save().unwrap();
        assert_eq!(mock.journal().album_gains().len(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_stop_returns_on_terminate() {
        let (tx, rx) = watch::channel(StopSignal::Run);
        let waiter = tokio::spawn(wait_for_stop(rx));
        tx.send(StopSignal::Terminate).unwrap();
        waiter.await.unwrap();
    }
}
