//! Mock tag writers for testing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::journal::{Journal, JournalEntry};
use crate::gain::ReplayGain;
use crate::profile::OutputFormat;
use crate::tags::{MetadataWriter, MetadataWriterFactory, TagError};

/// Hands out [`MockMetadataWriter`]s that journal what they save.
#[derive(Debug)]
pub struct MockTagWriterFactory {
    journal: Journal,
    fail_saves: Arc<AtomicBool>,
}

impl MockTagWriterFactory {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_saves: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes every subsequent save fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl MetadataWriterFactory for MockTagWriterFactory {
    fn open(
        &self,
        _format: OutputFormat,
        path: &Path,
    ) -> Result<Box<dyn MetadataWriter>, TagError> {
        Ok(Box::new(MockMetadataWriter {
            journal: self.journal.clone(),
            path: path.to_path_buf(),
            fail: self.fail_saves.load(Ordering::SeqCst),
            track: None,
            album: None,
        }))
    }
}

/// Writer recording staged gains into the journal on save.
#[derive(Debug)]
pub struct MockMetadataWriter {
    journal: Journal,
    path: PathBuf,
    fail: bool,
    track: Option<ReplayGain>,
    album: Option<ReplayGain>,
}

impl MetadataWriter for MockMetadataWriter {
    fn set_track_replay_gain(&mut self, gain: ReplayGain) {
        self.track = Some(gain);
    }

    fn set_album_replay_gain(&mut self, gain: ReplayGain) {
        self.album = Some(gain);
    }

    fn save(&mut self) -> Result<(), TagError> {
        if self.fail {
            return Err(TagError::write_failed(&self.path, "scripted failure"));
        }
        if let Some(gain) = self.track.take() {
            self.journal.record(JournalEntry::TrackGainWritten {
                file: self.path.clone(),
                gain,
            });
        }
        if let Some(gain) = self.album.take() {
            self.journal.record(JournalEntry::AlbumGainWritten {
                file: self.path.clone(),
                gain,
            });
        }
        Ok(())
    }
}
