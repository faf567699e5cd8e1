//! Trait definitions for the tags module.

use std::path::Path;

use super::error::TagError;
use crate::gain::ReplayGain;
use crate::profile::OutputFormat;

/// Writes replay-gain tags into one encoded file.
///
/// Setters only stage values; nothing touches the file until [`save`](Self::save).
pub trait MetadataWriter: Send {
    fn set_track_replay_gain(&mut self, gain: ReplayGain);

    fn set_album_replay_gain(&mut self, gain: ReplayGain);

    /// Writes all staged values to the file. May block on file or process
    /// I/O.
    fn save(&mut self) -> Result<(), TagError>;
}

/// Opens a format-specific [`MetadataWriter`] for a file.
pub trait MetadataWriterFactory: Send + Sync {
    fn open(&self, format: OutputFormat, path: &Path) -> Result<Box<dyn MetadataWriter>, TagError>;
}

/// Writer for formats that carry no tags. Every call succeeds and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetadataWriter;

impl MetadataWriter for NullMetadataWriter {
    fn set_track_replay_gain(&mut self, _gain: ReplayGain) {}

    fn set_album_replay_gain(&mut self, _gain: ReplayGain) {}

    fn save(&mut self) -> Result<(), TagError> {
        Ok(())
    }
}
