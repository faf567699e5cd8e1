//! Types for the tags module.

use serde::{Deserialize, Serialize};

use crate::disc::{Disc, Track};

pub const REPLAYGAIN_TRACK_GAIN: &str = "REPLAYGAIN_TRACK_GAIN";
pub const REPLAYGAIN_TRACK_PEAK: &str = "REPLAYGAIN_TRACK_PEAK";
pub const REPLAYGAIN_ALBUM_GAIN: &str = "REPLAYGAIN_ALBUM_GAIN";
pub const REPLAYGAIN_ALBUM_PEAK: &str = "REPLAYGAIN_ALBUM_PEAK";

/// Descriptive tags written into an encoded track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub track_number: u32,
    pub track_total: u32,
    pub disc_number: u32,
    pub disc_total: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    /// Cue sheet embedded as a `CUESHEET` tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cue_sheet: Option<String>,
}

impl TrackMetadata {
    /// Collects the tags of `track` on `disc`. Track performers fall back
    /// to the disc performer.
    pub fn for_track(disc: &Disc, track: &Track) -> Self {
        Self {
            title: track.tags.title.clone(),
            artist: track
                .tags
                .performer
                .clone()
                .or_else(|| disc.performer.clone()),
            album: Some(disc.album_title()),
            album_artist: disc.performer.clone(),
            date: disc.date.clone(),
            genre: disc.genre.clone(),
            track_number: track.number,
            track_total: disc.track_count() as u32,
            disc_number: disc.disc_number,
            disc_total: disc.disc_count,
            isrc: track.tags.isrc.clone(),
            cue_sheet: None,
        }
    }

    pub fn with_cue_sheet(mut self, cue: Option<String>) -> Self {
        self.cue_sheet = cue;
        self
    }

    /// Converts metadata to ffmpeg `-metadata` arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        if let Some(ref title) = self.title {
            pairs.push(("title", title.clone()));
        }
        if let Some(ref artist) = self.artist {
            pairs.push(("artist", artist.clone()));
        }
        if let Some(ref album) = self.album {
            pairs.push(("album", album.clone()));
        }
        if let Some(ref album_artist) = self.album_artist {
            pairs.push(("album_artist", album_artist.clone()));
        }
        if let Some(ref date) = self.date {
            pairs.push(("date", date.clone()));
        }
        if let Some(ref genre) = self.genre {
            pairs.push(("genre", genre.clone()));
        }
        if self.track_number > 0 {
            pairs.push(("track", format!("{}/{}", self.track_number, self.track_total)));
        }
        if self.disc_total > 1 {
            pairs.push(("disc", format!("{}/{}", self.disc_number, self.disc_total)));
        }
        if let Some(ref isrc) = self.isrc {
            pairs.push(("ISRC", isrc.clone()));
        }
        if let Some(ref cue) = self.cue_sheet {
            pairs.push(("CUESHEET", cue.clone()));
        }

        pairs
            .into_iter()
            .flat_map(|(key, value)| ["-metadata".to_string(), format!("{}={}", key, value)])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::{CueIndex, TrackTags};
    use std::path::PathBuf;

    fn disc() -> Disc {
        Disc {
            audio_file: PathBuf::from("/src/image.flac"),
            title: Some("Test Album".to_string()),
            performer: Some("Test Artist".to_string()),
            genre: Some("Jazz".to_string()),
            date: Some("2024".to_string()),
            disc_id: None,
            disc_number: 1,
            disc_count: 1,
            cover_image: None,
            tracks: vec![Track {
                index: 0,
                number: 1,
                tags: TrackTags {
                    title: Some("Test Song".to_string()),
                    performer: None,
                    isrc: None,
                },
                index00: None,
                index01: CueIndex::ZERO,
                end: None,
                result_path: PathBuf::from("/out/01.flac"),
                channels: 2,
            }],
        }
    }

    #[test]
    fn test_for_track_falls_back_to_disc_performer() {
        let disc = disc();
        let metadata = TrackMetadata::for_track(&disc, &disc.tracks[0]);
        assert_eq!(metadata.artist.as_deref(), Some("Test Artist"));
        assert_eq!(metadata.track_total, 1);
    }

    #[test]
    fn test_to_ffmpeg_args() {
        let disc = disc();
        let args = TrackMetadata::for_track(&disc, &disc.tracks[0])
            .with_cue_sheet(Some("TITLE \"x\"".to_string()))
            .to_ffmpeg_args();

        assert!(args.contains(&"-metadata".to_string()));
        assert!(args.contains(&"title=Test Song".to_string()));
        assert!(args.contains(&"album=Test Album".to_string()));
        assert!(args.contains(&"date=2024".to_string()));
        assert!(args.contains(&"track=1/1".to_string()));
        assert!(args.contains(&"CUESHEET=TITLE \"x\"".to_string()));
        // Single-disc releases carry no disc tag.
        assert!(!args.iter().any(|a| a.starts_with("disc=")));
    }
}
