pub mod config;
pub mod disc;
pub mod encoder;
pub mod ffmpeg;
pub mod finalize;
pub mod gain;
pub mod metrics;
pub mod pipeline;
pub mod profile;
pub mod runner;
pub mod splitter;
pub mod tags;
pub mod testing;
pub mod worker;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, RunnerConfig,
};
pub use disc::{CueIndex, Disc, Track, TrackTags};
pub use ffmpeg::FfmpegConfig;
pub use gain::{AlbumGain, ReplayGain};
pub use pipeline::{
    DiscPipeline, PipelineError, PipelineEvent, PipelineSetup, Slots, Toolkit, TrackState,
};
pub use profile::{
    CoverMode, CoverOptions, CueOptions, GainMode, OutputFormat, PregapMode, Profile,
};
pub use runner::{ConversionRunner, DiscSummary, RunSummary, StopHandle};
pub use worker::{PipelineId, StopSignal, WorkerMessage};
