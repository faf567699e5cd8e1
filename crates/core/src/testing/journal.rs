//! Shared call journal for ordering assertions.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::gain::ReplayGain;

/// One observable side effect of a mock collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    SplitStarted { tracks: Vec<usize> },
    SplitReady { track: usize },
    PregapReady,
    EncodeStarted { track: usize },
    EncodeFinished { track: usize },
    TrackGainWritten { file: PathBuf, gain: ReplayGain },
    AlbumGainWritten { file: PathBuf, gain: ReplayGain },
    Finalized { source: PathBuf, destination: PathBuf },
    CoverSaved { destination: PathBuf },
}

/// Append-only log shared by every mock of a [`MockToolkit`](super::MockToolkit).
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: JournalEntry) {
        self.lock().push(entry);
    }

    /// Snapshot of every entry so far.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Position of the first entry matching `pred`.
    pub fn position(&self, pred: impl Fn(&JournalEntry) -> bool) -> Option<usize> {
        self.lock().iter().position(pred)
    }

    /// Positions of every entry matching `pred`.
    pub fn positions(&self, pred: impl Fn(&JournalEntry) -> bool) -> Vec<usize> {
        self.lock()
            .iter()
            .enumerate()
            .filter(|(_, e)| pred(e))
            .map(|(i, _)| i)
            .collect()
    }

    /// Destinations of every finalized file, in order.
    pub fn finalized(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                JournalEntry::Finalized { destination, .. } => Some(destination.clone()),
                _ => None,
            })
            .collect()
    }

    /// Album gains written, in order.
    pub fn album_gains(&self) -> Vec<(PathBuf, ReplayGain)> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                JournalEntry::AlbumGainWritten { file, gain } => Some((file.clone(), *gain)),
                _ => None,
            })
            .collect()
    }

    /// Tracks whose encode was started, in order.
    pub fn encodes_started(&self) -> Vec<usize> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                JournalEntry::EncodeStarted { track } => Some(*track),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JournalEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
