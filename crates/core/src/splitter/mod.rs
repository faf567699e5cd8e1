//! Splitter module for cutting a disc image into per-track audio files.
//!
//! A split covers the whole disc in one pass and reports each finished
//! track on its own, so encodes can start while later tracks are still
//! being cut.

mod error;
mod ffmpeg;
mod traits;
mod types;
mod worker;

pub use error::SplitterError;
pub use ffmpeg::FfmpegSplitter;
pub use traits::Splitter;
pub use types::{SplitEvent, SplitJob, SplitRegion};
pub use worker::SplitWorker;
