//! Worker hosting a single encode.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::traits::Encoder;
use super::types::EncodeJob;
use crate::worker::{Worker, WorkerContext, WorkerEvent, WorkerKind};

/// Runs one [`EncodeJob`] and reports `EncodeReady` or `Error`, never both.
pub struct EncodeWorker {
    encoder: Arc<dyn Encoder>,
    job: EncodeJob,
}

impl EncodeWorker {
    pub fn new(encoder: Arc<dyn Encoder>, job: EncodeJob) -> Self {
        Self { encoder, job }
    }
}

#[async_trait]
impl Worker for EncodeWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Encode
    }

    async fn run(self: Box<Self>, ctx: &WorkerContext) {
        let EncodeWorker { encoder, job } = *self;
        let track = job.track;
        let (progress_tx, mut progress_rx) = mpsc::channel(16);

        ctx.progress(track, 0);
        let encode = encoder.encode(job, progress_tx, ctx.stop_receiver());
        tokio::pin!(encode);

        let result = loop {
            tokio::select! {
                result = &mut encode => break result,
                Some(percent) = progress_rx.recv() => ctx.progress(track, percent),
            }
        };

        match result {
            Ok(output) => {
                debug!(track, size = output.output_size_bytes, "Track encoded");
                ctx.emit(WorkerEvent::EncodeReady {
                    track,
                    file: output.output_path,
                    gain: output.gain,
                });
            }
            Err(e) if e.is_cancelled() => debug!(track, "Encode stopped"),
            Err(e) => {
                warn!(track, error = %e, "Encode failed");
                ctx.error(track, e.to_string());
            }
        }
    }
}
