//! The collaborators a pipeline delegates to.

use std::sync::Arc;

use crate::disc::{CoverProcessor, FfmpegCoverProcessor};
use crate::encoder::{Encoder, FfmpegEncoder};
use crate::ffmpeg::FfmpegConfig;
use crate::finalize::{Finalizer, FsFinalizer};
use crate::splitter::{FfmpegSplitter, Splitter};
use crate::tags::{FfmpegTagWriterFactory, MetadataWriterFactory};

/// Shared handles to the splitter, encoder, tag writers, finalizer and
/// cover processor. Cloning is cheap.
#[derive(Clone)]
pub struct Toolkit {
    pub splitter: Arc<dyn Splitter>,
    pub encoder: Arc<dyn Encoder>,
    pub tag_writers: Arc<dyn MetadataWriterFactory>,
    pub finalizer: Arc<dyn Finalizer>,
    pub covers: Arc<dyn CoverProcessor>,
}

impl Toolkit {
    /// The ffmpeg-backed toolkit.
    pub fn ffmpeg(config: &FfmpegConfig) -> Self {
        Self {
            splitter: Arc::new(FfmpegSplitter::new(config.clone())),
            encoder: Arc::new(FfmpegEncoder::new(config.clone())),
            tag_writers: Arc::new(FfmpegTagWriterFactory::new(config.ffmpeg_path.clone())),
            finalizer: Arc::new(FsFinalizer::new()),
            covers: Arc::new(FfmpegCoverProcessor::new(config.ffmpeg_path.clone())),
        }
    }
}
