//! Tag writing for encoded files.
//!
//! Encoders receive a [`TrackMetadata`] and write the descriptive tags while
//! encoding. Replay-gain values are only known after encoding, so they are
//! written afterwards through a [`MetadataWriter`] opened on the finished
//! file. Formats without tag support get a [`NullMetadataWriter`].

mod error;
mod ffmpeg;
mod traits;
mod types;

pub use error::TagError;
pub use ffmpeg::{FfmpegTagWriter, FfmpegTagWriterFactory};
pub use traits::{MetadataWriter, MetadataWriterFactory, NullMetadataWriter};
pub use types::{
    TrackMetadata, REPLAYGAIN_ALBUM_GAIN, REPLAYGAIN_ALBUM_PEAK, REPLAYGAIN_TRACK_GAIN,
    REPLAYGAIN_TRACK_PEAK,
};
