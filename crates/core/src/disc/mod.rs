//! Disc model and the short per-disc side tasks.
//!
//! A [`Disc`] is one audio source described by a cue sheet: an ordered list
//! of [`Track`]s with their cue index boundaries and destination paths.
//! This module also holds the cue-sheet renderer ([`CueCreator`]) and cover
//! image handling ([`CoverImage`], [`CoverProcessor`]) which the pipeline
//! runs synchronously before encoding starts.

mod cover;
mod cue;
mod types;

pub use cover::{CoverError, CoverImage, CoverProcessor, FfmpegCoverProcessor, ImageFormat};
pub use cue::{CueCreator, CueError, PREGAP_FILE_NAME};
pub use types::{CueIndex, CueIndexParseError, Disc, Track, TrackTags};
