//! File system finalizer implementation.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use super::error::FinalizeError;

/// Moves a finished temporary file to its final destination.
pub trait Finalizer: Send + Sync {
    /// Replaces `destination` with `source`. Any existing file at the
    /// destination is removed first.
    fn finalize(&self, source: &Path, destination: &Path) -> Result<(), FinalizeError>;
}

/// File system based finalizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsFinalizer;

impl FsFinalizer {
    pub fn new() -> Self {
        Self
    }

    /// Attempts to move a file atomically (rename). Returns `Ok(false)` when
    /// the paths are on different file systems.
    fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination) {
            Ok(()) => Ok(true),
            Err(e) => {
                // EXDEV is 18 on Linux
                if e.kind() == ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }
}

impl Finalizer for FsFinalizer {
    fn finalize(&self, source: &Path, destination: &Path) -> Result<(), FinalizeError> {
        if !source.exists() {
            return Err(FinalizeError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| FinalizeError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        match fs::remove_file(destination) {
            Ok(()) => debug!(path = %destination.display(), "Removed existing file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(FinalizeError::RemoveFailed {
                    path: destination.to_path_buf(),
                    source: e,
                })
            }
        }

        let move_err =
            |e| FinalizeError::move_failed(source.to_path_buf(), destination.to_path_buf(), e);

        if Self::try_atomic_move(source, destination).map_err(move_err)? {
            return Ok(());
        }

        debug!(
            source = %source.display(),
            destination = %destination.display(),
            "Cross-device move, copying"
        );
        fs::copy(source, destination).map_err(move_err)?;
        fs::remove_file(source).map_err(move_err)?;
        Ok(())
    }
}
