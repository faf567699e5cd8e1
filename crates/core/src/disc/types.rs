//! Types for the disc module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// CD frames per second (cue-sheet time resolution).
pub const FRAMES_PER_SECOND: u64 = 75;

/// A position in the disc audio, as written in a cue sheet (`mm:ss:ff`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CueIndex {
    frames: u64,
}

/// Error returned when a `mm:ss:ff` string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid cue index '{0}', expected mm:ss:ff")]
pub struct CueIndexParseError(pub String);

impl CueIndex {
    pub const ZERO: CueIndex = CueIndex { frames: 0 };

    /// Creates an index from minutes, seconds and frames.
    pub fn from_msf(minutes: u64, seconds: u64, frames: u64) -> Self {
        Self {
            frames: (minutes * 60 + seconds) * FRAMES_PER_SECOND + frames,
        }
    }

    /// Creates an index from a frame count.
    pub fn from_frames(frames: u64) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Position in milliseconds, truncated.
    pub fn milliseconds(&self) -> u64 {
        self.frames * 1000 / FRAMES_PER_SECOND
    }

    /// Position in seconds, as ffmpeg expects for `-ss`/`-to`.
    pub fn seconds(&self) -> f64 {
        self.frames as f64 / FRAMES_PER_SECOND as f64
    }

    /// Distance from `earlier` to `self`, saturating at zero.
    pub fn since(&self, earlier: CueIndex) -> CueIndex {
        CueIndex {
            frames: self.frames.saturating_sub(earlier.frames),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.frames == 0
    }
}

impl fmt::Display for CueIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frames = self.frames % FRAMES_PER_SECOND;
        let total_secs = self.frames / FRAMES_PER_SECOND;
        write!(f, "{:02}:{:02}:{:02}", total_secs / 60, total_secs % 60, frames)
    }
}

impl FromStr for CueIndex {
    type Err = CueIndexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 3 {
            return Err(CueIndexParseError(s.to_string()));
        }
        let parse = |p: &str| p.parse::<u64>().map_err(|_| CueIndexParseError(s.to_string()));
        let (m, sec, fr) = (parse(parts[0])?, parse(parts[1])?, parse(parts[2])?);
        if sec >= 60 || fr >= FRAMES_PER_SECOND {
            return Err(CueIndexParseError(s.to_string()));
        }
        Ok(Self::from_msf(m, sec, fr))
    }
}

impl TryFrom<String> for CueIndex {
    type Error = CueIndexParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CueIndex> for String {
    fn from(value: CueIndex) -> Self {
        value.to_string()
    }
}

/// Per-track tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
}

/// One track of a disc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Position within the disc, starting at 0.
    pub index: usize,
    /// Track number as printed in the cue sheet.
    pub number: u32,
    #[serde(default)]
    pub tags: TrackTags,
    /// INDEX 00, the start of the track's pregap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index00: Option<CueIndex>,
    /// INDEX 01, the start of the track proper.
    pub index01: CueIndex,
    /// End of the track (the next track's INDEX 01); `None` runs to the end of the audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<CueIndex>,
    /// Final destination of the encoded file.
    pub result_path: PathBuf,
    /// Channel count of the source audio for this track.
    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_channels() -> u16 {
    2
}

impl Track {
    /// Returns cue index `num` (0 or 1), if present.
    pub fn cue_index(&self, num: u8) -> Option<CueIndex> {
        match num {
            0 => self.index00,
            1 => Some(self.index01),
            _ => None,
        }
    }

    /// Duration of the track proper, when its end is known.
    pub fn duration(&self) -> Option<CueIndex> {
        self.end.map(|end| end.since(self.index01))
    }

    /// File name of the final destination.
    pub fn result_file_name(&self) -> String {
        self.result_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Directory that will receive the final file.
    pub fn result_dir(&self) -> &Path {
        self.result_path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Extension of the destination file.
    pub fn result_extension(&self) -> String {
        self.result_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// A disc: one audio source and its tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disc {
    /// Source audio file (the disc image).
    pub audio_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_id: Option<String>,
    #[serde(default = "default_disc_number")]
    pub disc_number: u32,
    #[serde(default = "default_disc_number")]
    pub disc_count: u32,
    /// Cover image shipped with the disc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<PathBuf>,
    pub tracks: Vec<Track>,
}

fn default_disc_number() -> u32 {
    1
}

impl Disc {
    /// Fills in each track's `end` from the next track's INDEX 01 and
    /// renumbers `index` by position.
    pub fn link_tracks(mut self) -> Self {
        let starts: Vec<CueIndex> = self.tracks.iter().map(|t| t.index01).collect();
        for (i, track) in self.tracks.iter_mut().enumerate() {
            track.index = i;
            if track.end.is_none() {
                track.end = starts.get(i + 1).copied();
            }
        }
        self
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Album title used in tags, falling back to the audio file stem.
    pub fn album_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            self.audio_file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default()
        })
    }
}
