//! Per-track cue-sheet rendering.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::profile::PregapMode;

use super::types::{CueIndex, Disc, Track};

/// File name used for an extracted pregap region.
pub const PREGAP_FILE_NAME: &str = "pregap.wav";

/// Errors that can occur while writing a cue sheet.
#[derive(Debug, Error)]
pub enum CueError {
    #[error("Failed to write cue sheet {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot create a cue sheet without tracks")]
    NoTracks,
}

/// Renders a cue sheet that describes the converted output files.
///
/// Each track lives in its own `FILE`. A track's pregap (INDEX 00) sits at
/// the tail of the previous track's file, except for the first track whose
/// pregap handling follows the [`PregapMode`].
pub struct CueCreator<'a> {
    disc: &'a Disc,
    tracks: &'a [Track],
    pregap: PregapMode,
}

impl<'a> CueCreator<'a> {
    pub fn new(disc: &'a Disc, tracks: &'a [Track], pregap: PregapMode) -> Self {
        Self {
            disc,
            tracks,
            pregap,
        }
    }

    /// Renders the cue sheet text.
    pub fn render(&self) -> Result<String, CueError> {
        let first = self.tracks.first().ok_or(CueError::NoTracks)?;
        let mut out = String::new();

        if let Some(genre) = &self.disc.genre {
            let _ = writeln!(out, "REM GENRE {}", quote(genre));
        }
        if let Some(date) = &self.disc.date {
            let _ = writeln!(out, "REM DATE {}", date);
        }
        if let Some(disc_id) = &self.disc.disc_id {
            let _ = writeln!(out, "REM DISCID {}", disc_id);
        }
        let _ = writeln!(out, "REM COMMENT \"discoder {}\"", env!("CARGO_PKG_VERSION"));
        if let Some(performer) = &self.disc.performer {
            let _ = writeln!(out, "PERFORMER {}", quote(performer));
        }
        let _ = writeln!(out, "TITLE {}", quote(&self.disc.album_title()));

        let has_pregap = first.index == 0 && !first.index01.is_zero();
        // Disc position at which the previous output file starts.
        let mut previous_start: Option<CueIndex> = None;

        for track in self.tracks {
            let file_line = format!("FILE {} WAVE", quote(&track.result_file_name()));
            let mut file_start = track.index01;

            match previous_start {
                None if has_pregap && self.pregap == PregapMode::ExtractToFile => {
                    let _ = writeln!(out, "FILE {} WAVE", quote(PREGAP_FILE_NAME));
                    self.write_track_header(&mut out, track);
                    let _ = writeln!(out, "    INDEX 00 {}", CueIndex::ZERO);
                    let _ = writeln!(out, "{}", file_line);
                    let _ = writeln!(out, "    INDEX 01 {}", CueIndex::ZERO);
                }
                None if has_pregap && self.pregap == PregapMode::AddToFirstTrack => {
                    let _ = writeln!(out, "{}", file_line);
                    self.write_track_header(&mut out, track);
                    let _ = writeln!(out, "    INDEX 00 {}", CueIndex::ZERO);
                    let _ = writeln!(out, "    INDEX 01 {}", track.index01);
                    file_start = CueIndex::ZERO;
                }
                Some(prev_start) if track.index00.is_some_and(|i0| i0 < track.index01) => {
                    // The pregap is still inside the previous file.
                    let index00 = track.index00.unwrap_or(track.index01);
                    self.write_track_header(&mut out, track);
                    let _ = writeln!(out, "    INDEX 00 {}", index00.since(prev_start));
                    let _ = writeln!(out, "{}", file_line);
                    let _ = writeln!(out, "    INDEX 01 {}", CueIndex::ZERO);
                }
                _ => {
                    let _ = writeln!(out, "{}", file_line);
                    self.write_track_header(&mut out, track);
                    let _ = writeln!(out, "    INDEX 01 {}", CueIndex::ZERO);
                }
            }

            previous_start = Some(file_start);
        }

        Ok(out)
    }

    /// Writes the rendered cue sheet to `path`.
    pub fn write_to_file(&self, path: &Path) -> Result<(), CueError> {
        let text = self.render()?;
        std::fs::write(path, text).map_err(|source| CueError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_track_header(&self, out: &mut String, track: &Track) {
        let _ = writeln!(out, "  TRACK {:02} AUDIO", track.number);
        if let Some(title) = &track.tags.title {
            let _ = writeln!(out, "    TITLE {}", quote(title));
        }
        if let Some(performer) = &track.tags.performer {
            let _ = writeln!(out, "    PERFORMER {}", quote(performer));
        }
        if let Some(isrc) = &track.tags.isrc {
            let _ = writeln!(out, "    ISRC {}", isrc);
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "'"))
}
