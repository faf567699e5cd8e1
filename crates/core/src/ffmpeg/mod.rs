//! Shared ffmpeg process handling for the splitter and the encoder.

mod config;
mod error;
mod process;

pub use config::FfmpegConfig;
pub use error::FfmpegError;
pub use process::FfmpegProcess;
