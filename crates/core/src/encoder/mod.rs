//! Encoder module for turning one decoded track into its output format.
//!
//! This module provides:
//! - `Encoder` trait for pluggable encoder backends
//! - `FfmpegEncoder` implementation using ffmpeg, with replay-gain measurement
//! - `EncodeWorker`, the worker that hosts one encode on its own thread

mod error;
mod ffmpeg;
mod traits;
mod types;
mod worker;

pub use error::EncoderError;
pub use ffmpeg::FfmpegEncoder;
pub use traits::Encoder;
pub use types::{EncodeJob, EncodeOutput};
pub use worker::EncodeWorker;
