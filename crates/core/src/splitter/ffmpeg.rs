//! FFmpeg-based splitter implementation.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::error::SplitterError;
use super::traits::Splitter;
use super::types::{SplitEvent, SplitJob, SplitRegion};
use crate::ffmpeg::{FfmpegConfig, FfmpegProcess};
use crate::worker::StopSignal;

/// Decodes each region of the disc image to 24-bit PCM WAV with ffmpeg.
pub struct FfmpegSplitter {
    config: FfmpegConfig,
}

impl FfmpegSplitter {
    /// Creates a new FFmpeg splitter with the given configuration.
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }

    /// Creates a splitter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FfmpegConfig::default())
    }

    fn build_args(&self, job: &SplitJob, region: &SplitRegion) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        // Input seeking is sample accurate for audio
        if !region.start.is_zero() {
            args.extend(["-ss".to_string(), format!("{:.6}", region.start.seconds())]);
        }
        args.extend([
            "-i".to_string(),
            job.audio_file.to_string_lossy().to_string(),
        ]);
        if let Some(duration) = region.duration() {
            args.extend(["-t".to_string(), format!("{:.6}", duration.seconds())]);
        }

        args.extend([
            "-map".to_string(),
            "0:a:0".to_string(),
            "-map_metadata".to_string(),
            "-1".to_string(),
            "-c:a".to_string(),
            "pcm_s24le".to_string(),
            "-loglevel".to_string(),
            self.config.log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ]);
        args.extend(self.config.extra_args.iter().cloned());
        args.push(region.output.to_string_lossy().to_string());
        args
    }
}

#[async_trait]
impl Splitter for FfmpegSplitter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn split(
        &self,
        job: SplitJob,
        events: mpsc::UnboundedSender<SplitEvent>,
        stop: watch::Receiver<StopSignal>,
    ) -> Result<(), SplitterError> {
        let regions = job.regions();
        let first_track = regions.first().map(|r| r.track).unwrap_or_default();

        if !tokio::fs::try_exists(&job.audio_file).await.unwrap_or(false) {
            return Err(SplitterError::InputNotFound {
                track: first_track,
                path: job.audio_file.clone(),
            });
        }

        tokio::fs::create_dir_all(&job.out_dir)
            .await
            .map_err(|source| SplitterError::OutputDirectoryFailed {
                track: first_track,
                path: job.out_dir.clone(),
                source,
            })?;

        for region in &regions {
            let number = job
                .tracks
                .iter()
                .find(|t| t.index == region.track)
                .map(|t| t.number)
                .unwrap_or_default();
            debug!(
                track = region.track,
                pregap = region.is_pregap,
                start = %region.start,
                "Splitting region"
            );

            // Forward ffmpeg progress as this region's track progress
            let (progress_tx, mut progress_rx) = mpsc::channel::<u8>(16);
            let forward_events = events.clone();
            let track = region.track;
            let forwarder = tokio::spawn(async move {
                while let Some(percent) = progress_rx.recv().await {
                    let _ = forward_events.send(SplitEvent::Progress { track, percent });
                }
            });

            let result = FfmpegProcess::new(&self.config, self.build_args(&job, region))
                .with_duration(region.duration().map(|d| d.seconds()))
                .run(Some(progress_tx), stop.clone())
                .await;
            let _ = forwarder.await;

            result.map_err(|source| SplitterError::Ffmpeg {
                track: region.track,
                number,
                source,
            })?;

            if !tokio::fs::try_exists(&region.output).await.unwrap_or(false) {
                return Err(SplitterError::OutputMissing {
                    track: region.track,
                    path: region.output.clone(),
                });
            }

            let event = if region.is_pregap {
                SplitEvent::PregapReady {
                    file: region.output.clone(),
                }
            } else {
                SplitEvent::TrackReady {
                    track: region.track,
                    file: region.output.clone(),
                }
            };
            let _ = events.send(event);
        }

        Ok(())
    }
}
