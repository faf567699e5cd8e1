//! FFmpeg-based tag writer.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::debug;

use super::error::TagError;
use super::traits::{MetadataWriter, MetadataWriterFactory, NullMetadataWriter};
use super::types::{
    REPLAYGAIN_ALBUM_GAIN, REPLAYGAIN_ALBUM_PEAK, REPLAYGAIN_TRACK_GAIN, REPLAYGAIN_TRACK_PEAK,
};
use crate::gain::ReplayGain;
use crate::profile::OutputFormat;

/// Rewrites a file's tags by remuxing it through ffmpeg with stream copy.
///
/// The remux goes to a sibling file which then replaces the original, so a
/// failed write never leaves a truncated file behind.
pub struct FfmpegTagWriter {
    ffmpeg_path: PathBuf,
    path: PathBuf,
    tags: Vec<(&'static str, String)>,
}

impl FfmpegTagWriter {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            path: path.into(),
            tags: Vec::new(),
        }
    }

    fn set(&mut self, key: &'static str, value: String) {
        self.tags.retain(|(k, _)| *k != key);
        self.tags.push((key, value));
    }

    fn scratch_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        self.path.with_file_name(format!("{}.tagging.{}", stem, ext))
    }

    fn build_args(&self, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            self.path.to_string_lossy().to_string(),
            "-map".to_string(),
            "0".to_string(),
            "-map_metadata".to_string(),
            "0".to_string(),
            "-c".to_string(),
            "copy".to_string(),
        ];
        for (key, value) in &self.tags {
            args.extend(["-metadata".to_string(), format!("{}={}", key, value)]);
        }
        args.push(output.to_string_lossy().to_string());
        args
    }
}

impl MetadataWriter for FfmpegTagWriter {
    fn set_track_replay_gain(&mut self, gain: ReplayGain) {
        self.set(REPLAYGAIN_TRACK_GAIN, gain.gain_tag());
        self.set(REPLAYGAIN_TRACK_PEAK, gain.peak_tag());
    }

    fn set_album_replay_gain(&mut self, gain: ReplayGain) {
        self.set(REPLAYGAIN_ALBUM_GAIN, gain.gain_tag());
        self.set(REPLAYGAIN_ALBUM_PEAK, gain.peak_tag());
    }

    fn save(&mut self) -> Result<(), TagError> {
        if self.tags.is_empty() {
            return Ok(());
        }
        if !self.path.exists() {
            return Err(TagError::FileNotFound {
                path: self.path.clone(),
            });
        }

        let scratch = self.scratch_path();
        debug!(path = %self.path.display(), tags = self.tags.len(), "Writing tags");

        let mut command = Command::new(&self.ffmpeg_path);
        command.args(self.build_args(&scratch)).stdin(Stdio::null());
        let output = run_blocking(|| command.output()).map_err(|source| TagError::Spawn {
                program: self.ffmpeg_path.clone(),
                source,
            })?;

        if !output.status.success() {
            let _ = std::fs::remove_file(&scratch);
            return Err(TagError::write_failed(
                &self.path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        std::fs::rename(&scratch, &self.path)?;
        self.tags.clear();
        Ok(())
    }
}

/// Runs `f`, telling a multi-threaded tokio runtime that the current worker
/// is about to block so its other tasks move elsewhere.
fn run_blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Opens an [`FfmpegTagWriter`], or a [`NullMetadataWriter`] for formats
/// without tags.
#[derive(Debug, Clone)]
pub struct FfmpegTagWriterFactory {
    ffmpeg_path: PathBuf,
}

impl FfmpegTagWriterFactory {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Default for FfmpegTagWriterFactory {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl MetadataWriterFactory for FfmpegTagWriterFactory {
    fn open(&self, format: OutputFormat, path: &Path) -> Result<Box<dyn MetadataWriter>, TagError> {
        if !format.supports_tags() {
            return Ok(Box::new(NullMetadataWriter));
        }
        Ok(Box::new(FfmpegTagWriter::new(&self.ffmpeg_path, path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_gain_args() {
        let mut writer = FfmpegTagWriter::new("ffmpeg", "/out/01.flac");
        writer.set_track_replay_gain(ReplayGain::new(-6.5, 0.9));
        writer.set_album_replay_gain(ReplayGain::new(-7.25, 0.99));

        let args = writer.build_args(Path::new("/out/01.tagging.flac"));
        assert!(args.contains(&"REPLAYGAIN_TRACK_GAIN=-6.50 dB".to_string()));
        assert!(args.contains(&"REPLAYGAIN_TRACK_PEAK=0.90000000".to_string()));
        assert!(args.contains(&"REPLAYGAIN_ALBUM_GAIN=-7.25 dB".to_string()));
        assert!(args.contains(&"REPLAYGAIN_ALBUM_PEAK=0.99000000".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/out/01.tagging.flac"));
    }

    #[test]
    fn test_setting_twice_keeps_last_value() {
        let mut writer = FfmpegTagWriter::new("ffmpeg", "/out/01.flac");
        writer.set_track_replay_gain(ReplayGain::new(-1.0, 0.1));
        writer.set_track_replay_gain(ReplayGain::new(-2.0, 0.2));
        assert_eq!(writer.tags.len(), 2);
        assert_eq!(writer.scratch_path(), PathBuf::from("/out/01.tagging.flac"));
    }

    #[test]
    fn test_save_missing_file() {
        let mut writer = FfmpegTagWriter::new("ffmpeg", "/nonexistent/01.flac");
        writer.set_track_replay_gain(ReplayGain::new(-1.0, 0.1));
        assert!(matches!(writer.save(), Err(TagError::FileNotFound { .. })));
    }

    fn writer_without_ffmpeg(dir: &tempfile::TempDir) -> FfmpegTagWriter {
        let path = dir.path().join("01.flac");
        std::fs::write(&path, b"encoded").unwrap();
        let mut writer = FfmpegTagWriter::new("/nonexistent/bin/ffmpeg", path);
        writer.set_track_replay_gain(ReplayGain::new(-1.0, 0.1));
        writer
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_save_inside_multi_thread_runtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut writer = writer_without_ffmpeg(&dir);
        assert!(matches!(writer.save(), Err(TagError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_save_inside_current_thread_runtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut writer = writer_without_ffmpeg(&dir);
        assert!(matches!(writer.save(), Err(TagError::Spawn { .. })));
    }

    #[test]
    fn test_run_blocking_outside_runtime() {
        assert_eq!(run_blocking(|| 7), 7);
    }

    #[test]
    fn test_factory_uses_null_writer_for_wav() {
        let factory = FfmpegTagWriterFactory::default();
        let mut writer = factory
            .open(OutputFormat::Wav, Path::new("/nonexistent/01.wav"))
            .unwrap();
        writer.set_track_replay_gain(ReplayGain::new(-1.0, 0.1));
        assert!(writer.save().is_ok());
    }
}
