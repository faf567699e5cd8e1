//! Mock cover processor for testing.

use std::path::Path;

use super::journal::{Journal, JournalEntry};
use crate::disc::{CoverError, CoverImage, CoverProcessor};

/// Writes the image bytes unchanged, whatever the requested scale.
#[derive(Debug)]
pub struct MockCoverProcessor {
    journal: Journal,
}

impl MockCoverProcessor {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl CoverProcessor for MockCoverProcessor {
    fn save_as(&self, image: &CoverImage, destination: &Path) -> Result<(), CoverError> {
        std::fs::write(destination, &image.data).map_err(|source| CoverError::Write {
            path: destination.to_path_buf(),
            source,
        })?;
        self.journal.record(JournalEntry::CoverSaved {
            destination: destination.to_path_buf(),
        });
        Ok(())
    }
}
