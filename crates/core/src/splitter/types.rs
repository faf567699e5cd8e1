//! Types for the splitter module.

use std::path::{Path, PathBuf};

use crate::disc::{CueIndex, Track, PREGAP_FILE_NAME};
use crate::profile::PregapMode;

/// A split request for one disc: every listed track is cut in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitJob {
    /// The disc image.
    pub audio_file: PathBuf,
    pub tracks: Vec<Track>,
    /// Directory receiving the decoded files.
    pub out_dir: PathBuf,
    pub pregap: PregapMode,
}

/// One contiguous region of the disc image to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRegion {
    /// Index of the track this region belongs to; the pregap region is
    /// attributed to the first track.
    pub track: usize,
    /// Whether this is the extracted pregap.
    pub is_pregap: bool,
    pub start: CueIndex,
    /// `None` runs to the end of the audio.
    pub end: Option<CueIndex>,
    pub output: PathBuf,
}

impl SplitRegion {
    pub fn duration(&self) -> Option<CueIndex> {
        self.end.map(|end| end.since(self.start))
    }
}

/// Progress reported by a running split.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitEvent {
    Progress { track: usize, percent: u8 },
    TrackReady { track: usize, file: PathBuf },
    PregapReady { file: PathBuf },
}

impl SplitJob {
    /// Regions to cut, in disc order.
    ///
    /// With [`PregapMode::ExtractToFile`] the audio before the first track's
    /// INDEX 01 becomes its own leading region. With
    /// [`PregapMode::AddToFirstTrack`] the first track starts at 0.
    pub fn regions(&self) -> Vec<SplitRegion> {
        let mut regions = Vec::with_capacity(self.tracks.len() + 1);

        for (pos, track) in self.tracks.iter().enumerate() {
            let mut start = track.index01;

            if pos == 0 && !track.index01.is_zero() {
                match self.pregap {
                    PregapMode::ExtractToFile => regions.push(SplitRegion {
                        track: track.index,
                        is_pregap: true,
                        start: CueIndex::ZERO,
                        end: Some(track.index01),
                        output: self.out_dir.join(PREGAP_FILE_NAME),
                    }),
                    PregapMode::AddToFirstTrack => start = CueIndex::ZERO,
                    PregapMode::Skip => {}
                }
            }

            regions.push(SplitRegion {
                track: track.index,
                is_pregap: false,
                start,
                end: track.end,
                output: Self::track_file(&self.out_dir, track),
            });
        }

        regions
    }

    /// Decoded file for `track` inside `dir`, named by its disc index.
    pub fn track_file(dir: &Path, track: &Track) -> PathBuf {
        dir.join(format!("track-{:02}.wav", track.index))
    }
}
