//! Conversion profiles.
//!
//! A [`Profile`] describes what a disc is converted into: the output format
//! and its encoder settings, the replay-gain mode, cover image handling and
//! cue-sheet creation. Profiles are plain values handed to each pipeline at
//! construction; nothing inside the pipeline reaches for a global settings
//! store.

mod types;

pub use types::{CoverMode, CoverOptions, CueOptions, GainMode, OutputFormat, PregapMode, Profile};
