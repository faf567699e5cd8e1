//! Types for the profile module.

use serde::{Deserialize, Serialize};

/// Output audio format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Free Lossless Audio Codec (lossless)
    Flac,
    /// MPEG Audio Layer III
    Mp3,
    /// Advanced Audio Coding in an MP4 container
    Aac,
    /// Ogg Vorbis
    OggVorbis,
    /// Opus
    Opus,
    /// WavPack (lossless)
    WavPack,
    /// Apple Lossless
    Alac,
    /// WAVE (uncompressed)
    Wav,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Mp3 => "mp3",
            Self::Aac => "m4a",
            Self::OggVorbis => "ogg",
            Self::Opus => "opus",
            Self::WavPack => "wv",
            Self::Alac => "m4a",
            Self::Wav => "wav",
        }
    }

    /// Returns the ffmpeg codec name for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Mp3 => "libmp3lame",
            Self::Aac => "aac",
            Self::OggVorbis => "libvorbis",
            Self::Opus => "libopus",
            Self::WavPack => "wavpack",
            Self::Alac => "alac",
            Self::Wav => "pcm_s16le",
        }
    }

    /// Whether this format is lossless.
    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Flac | Self::WavPack | Self::Alac | Self::Wav)
    }

    /// Whether files of this format carry tags (and thus replay-gain values).
    pub fn supports_tags(&self) -> bool {
        !matches!(self, Self::Wav)
    }

    /// Whether an attached cover picture can be muxed into this format.
    pub fn supports_embedded_cover(&self) -> bool {
        matches!(self, Self::Flac | Self::Mp3 | Self::Aac | Self::Alac)
    }

    /// Whether a CUESHEET tag can be stored in this format.
    pub fn supports_embedded_cue(&self) -> bool {
        matches!(self, Self::Flac | Self::WavPack | Self::OggVorbis | Self::Opus)
    }
}

/// Replay-gain calculation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainMode {
    /// No replay gain.
    #[default]
    Disable,
    /// Per-track gain only.
    Track,
    /// Per-track gain plus an album figure computed once every track is encoded.
    Album,
}

/// How a cover image is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverMode {
    #[default]
    Disable,
    /// Keep the original image as is.
    OrigSize,
    /// Downscale so the longest edge is at most `size` pixels.
    Scale,
}

/// Cover options for either copying or embedding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverOptions {
    #[serde(default)]
    pub mode: CoverMode,
    /// Max edge in pixels; only meaningful with [`CoverMode::Scale`].
    #[serde(default)]
    pub size: u32,
}

impl CoverOptions {
    /// Returns the requested scale, 0 meaning "keep original size".
    pub fn scale_size(&self) -> u32 {
        match self.mode {
            CoverMode::Scale => self.size,
            _ => 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != CoverMode::Disable
    }
}

/// Handling of the audio that precedes the first track's INDEX 01.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PregapMode {
    /// Drop the pregap audio.
    #[default]
    Skip,
    /// Extract the pregap as its own leading region (`pregap.wav`).
    ExtractToFile,
    /// Let the first track start at the very beginning of the disc.
    AddToFirstTrack,
}

/// Cue-sheet options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueOptions {
    /// Write a per-track cue sheet next to the output files.
    #[serde(default)]
    pub create: bool,
    /// Embed the cue sheet into every output file as a CUESHEET tag.
    #[serde(default)]
    pub embed: bool,
    /// File name of the written cue sheet.
    #[serde(default = "default_cue_file_name")]
    pub file_name: String,
    #[serde(default)]
    pub pregap: PregapMode,
}

fn default_cue_file_name() -> String {
    "disc.cue".to_string()
}

impl Default for CueOptions {
    fn default() -> Self {
        Self {
            create: false,
            embed: false,
            file_name: default_cue_file_name(),
            pregap: PregapMode::default(),
        }
    }
}

/// A conversion profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile identifier (e.g. "flac", "mp3-v0").
    #[serde(default = "default_profile_id")]
    pub id: String,
    pub format: OutputFormat,
    /// Target bitrate in kbps (lossy formats).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    /// Compression level (lossless formats).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<u8>,
    /// Resample to this rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate_hz: Option<u32>,
    #[serde(default)]
    pub gain_mode: GainMode,
    #[serde(default)]
    pub copy_cover: CoverOptions,
    #[serde(default)]
    pub embed_cover: CoverOptions,
    #[serde(default)]
    pub cue: CueOptions,
}

fn default_profile_id() -> String {
    "default".to_string()
}

impl Profile {
    /// Creates a profile for `format` with everything else at defaults.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            id: format.extension().to_string(),
            format,
            bitrate_kbps: None,
            compression_level: None,
            sample_rate_hz: None,
            gain_mode: GainMode::Disable,
            copy_cover: CoverOptions::default(),
            embed_cover: CoverOptions::default(),
            cue: CueOptions::default(),
        }
    }

    /// Sets the replay-gain mode.
    pub fn with_gain_mode(mut self, mode: GainMode) -> Self {
        self.gain_mode = mode;
        self
    }

    /// Sets the cue options.
    pub fn with_cue(mut self, cue: CueOptions) -> Self {
        self.cue = cue;
        self
    }

    /// Sets cover copy and embed options.
    pub fn with_covers(mut self, copy: CoverOptions, embed: CoverOptions) -> Self {
        self.copy_cover = copy;
        self.embed_cover = embed;
        self
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(OutputFormat::Flac)
    }
}
