//! FFmpeg-based encoder implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use std::path::Path;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::error::EncoderError;
use super::traits::Encoder;
use super::types::{EncodeJob, EncodeOutput};
use crate::ffmpeg::{FfmpegConfig, FfmpegProcess};
use crate::gain::ReplayGain;
use crate::metrics;
use crate::profile::{OutputFormat, Profile};
use crate::worker::StopSignal;

/// FFmpeg-based encoder implementation.
pub struct FfmpegEncoder {
    config: FfmpegConfig,
}

impl FfmpegEncoder {
    /// Creates a new FFmpeg encoder with the given configuration.
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }

    /// Creates an encoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FfmpegConfig::default())
    }

    /// Builds ffmpeg arguments for encoding one track.
    fn build_args(&self, job: &EncodeJob) -> Vec<String> {
        let profile = &job.profile;
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
        ];

        // Cover art for formats that can carry it
        match &job.cover_path {
            Some(cover) if profile.format.supports_embedded_cover() => {
                args.extend([
                    "-i".to_string(),
                    cover.to_string_lossy().to_string(),
                    "-map".to_string(),
                    "0:a".to_string(),
                    "-map".to_string(),
                    "1:v".to_string(),
                    "-c:v".to_string(),
                    "copy".to_string(),
                    "-disposition:v:0".to_string(),
                    "attached_pic".to_string(),
                ]);
            }
            _ => args.extend(["-map".to_string(), "0:a".to_string()]),
        }

        args.extend(Self::codec_args(profile));

        if profile.format == OutputFormat::Mp3 {
            args.extend(["-id3v2_version".to_string(), "3".to_string()]);
        }

        // Metadata
        if profile.format.supports_tags() {
            let mut metadata = job.metadata.clone();
            if !profile.format.supports_embedded_cue() {
                metadata.cue_sheet = None;
            }
            args.extend(metadata.to_ffmpeg_args());
        }

        // Log level and progress
        args.extend([
            "-loglevel".to_string(),
            self.config.log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ]);

        // Extra args
        args.extend(self.config.extra_args.iter().cloned());

        // Output
        args.push(job.output_path.to_string_lossy().to_string());

        args
    }

    fn codec_args(profile: &Profile) -> Vec<String> {
        let mut args = vec!["-c:a".to_string(), profile.format.ffmpeg_codec().to_string()];

        // Bitrate (for lossy formats)
        if !profile.format.is_lossless() {
            if let Some(bitrate) = profile.bitrate_kbps {
                args.extend(["-b:a".to_string(), format!("{}k", bitrate)]);
            }
        }

        // Compression level (for lossless formats)
        if profile.format.is_lossless() && profile.format != OutputFormat::Wav {
            if let Some(level) = profile.compression_level {
                args.extend(["-compression_level".to_string(), level.to_string()]);
            }
        }

        if let Some(rate) = profile.sample_rate_hz {
            args.extend(["-ar".to_string(), rate.to_string()]);
        }

        args
    }

    fn gain_args(input: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-loglevel".to_string(),
            "info".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:a".to_string(),
            "-af".to_string(),
            "replaygain".to_string(),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ]
    }

    /// Parses the `replaygain` filter summary from ffmpeg's log output.
    fn parse_replay_gain(output: &str) -> Result<ReplayGain, EncoderError> {
        let gain_re = Regex::new(r"track_gain\s*=\s*([-+]?\d+(?:\.\d+)?)\s*dB")
            .map_err(|e| EncoderError::gain_measurement_failed(e.to_string()))?;
        let peak_re = Regex::new(r"track_peak\s*=\s*(\d+(?:\.\d+)?)")
            .map_err(|e| EncoderError::gain_measurement_failed(e.to_string()))?;

        let capture = |re: &Regex, what: &str| -> Result<f64, EncoderError> {
            re.captures_iter(output)
                .last()
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .ok_or_else(|| {
                    EncoderError::gain_measurement_failed(format!("no {} in ffmpeg output", what))
                })
        };

        Ok(ReplayGain::new(
            capture(&gain_re, "track_gain")?,
            capture(&peak_re, "track_peak")?,
        ))
    }

    async fn measure_gain(
        &self,
        input: &Path,
        stop: watch::Receiver<StopSignal>,
    ) -> Result<ReplayGain, EncoderError> {
        let output = FfmpegProcess::new(&self.config, Self::gain_args(input))
            .run(None, stop)
            .await?;
        Self::parse_replay_gain(&output)
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn encode(
        &self,
        job: EncodeJob,
        progress_tx: mpsc::Sender<u8>,
        stop: watch::Receiver<StopSignal>,
    ) -> Result<EncodeOutput, EncoderError> {
        let start = Instant::now();

        if !tokio::fs::try_exists(&job.input_path).await.unwrap_or(false) {
            return Err(EncoderError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        // Ensure output directory exists
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                EncoderError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }

        let args = self.build_args(&job);
        debug!(track = job.track, output = %job.output_path.display(), "Encoding track");

        FfmpegProcess::new(&self.config, args)
            .with_duration(job.duration_secs)
            .run(Some(progress_tx), stop.clone())
            .await?;

        let output_meta = tokio::fs::metadata(&job.output_path)
            .await
            .map_err(|_| EncoderError::OutputMissing {
                path: job.output_path.clone(),
            })?;

        let gain = if job.measure_gain {
            Some(self.measure_gain(&job.input_path, stop).await?)
        } else {
            None
        };

        metrics::ENCODE_DURATION
            .with_label_values(&[job.profile.format.extension()])
            .observe(start.elapsed().as_secs_f64());

        Ok(EncodeOutput {
            track: job.track,
            output_path: job.output_path,
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            gain,
        })
    }
}
