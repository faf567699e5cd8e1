//! Mock finalizer for testing.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::journal::{Journal, JournalEntry};
use crate::finalize::{FinalizeError, Finalizer, FsFinalizer};

/// Mock implementation of the Finalizer trait.
///
/// Records every move. By default nothing is touched on disk; with
/// [`set_passthrough`](Self::set_passthrough) files really are moved.
#[derive(Debug)]
pub struct MockFinalizer {
    journal: Journal,
    fail_destination: Mutex<Option<PathBuf>>,
    passthrough: Mutex<bool>,
}

impl MockFinalizer {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_destination: Mutex::new(None),
            passthrough: Mutex::new(false),
        }
    }

    /// Fails the move into `destination`.
    pub fn fail_on(&self, destination: impl Into<PathBuf>) {
        *self
            .fail_destination
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(destination.into());
    }

    /// Delegates moves to [`FsFinalizer`].
    pub fn set_passthrough(&self, passthrough: bool) {
        *self.passthrough.lock().unwrap_or_else(|e| e.into_inner()) = passthrough;
    }
}

impl Finalizer for MockFinalizer {
    fn finalize(&self, source: &Path, destination: &Path) -> Result<(), FinalizeError> {
        let fail = self
            .fail_destination
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_deref()
            == Some(destination);
        if fail {
            return Err(FinalizeError::move_failed(
                source.to_path_buf(),
                destination.to_path_buf(),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "scripted failure"),
            ));
        }

        if *self.passthrough.lock().unwrap_or_else(|e| e.into_inner()) {
            FsFinalizer::new().finalize(source, destination)?;
        }

        self.journal.record(JournalEntry::Finalized {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
        });
        Ok(())
    }
}
