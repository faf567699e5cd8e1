//! Worker hosting a disc split.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::traits::Splitter;
use super::types::{SplitEvent, SplitJob};
use crate::worker::{Worker, WorkerContext, WorkerEvent, WorkerKind};

/// Runs one [`SplitJob`], forwarding each finished track as it appears.
pub struct SplitWorker {
    splitter: Arc<dyn Splitter>,
    job: SplitJob,
}

impl SplitWorker {
    pub fn new(splitter: Arc<dyn Splitter>, job: SplitJob) -> Self {
        Self { splitter, job }
    }

    fn forward(ctx: &WorkerContext, event: SplitEvent) {
        match event {
            SplitEvent::Progress { track, percent } => ctx.progress(track, percent),
            SplitEvent::TrackReady { track, file } => {
                ctx.emit(WorkerEvent::SplitReady { track, file })
            }
            SplitEvent::PregapReady { file } => ctx.emit(WorkerEvent::PregapReady { file }),
        }
    }
}

#[async_trait]
impl Worker for SplitWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Split
    }

    async fn run(self: Box<Self>, ctx: &WorkerContext) {
        let SplitWorker { splitter, job } = *self;
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let split = splitter.split(job, events_tx, ctx.stop_receiver());
        tokio::pin!(split);

        let result = loop {
            tokio::select! {
                result = &mut split => break result,
                Some(event) = events_rx.recv() => Self::forward(ctx, event),
            }
        };

        // Deliver anything sent right before the split returned
        while let Ok(event) = events_rx.try_recv() {
            Self::forward(ctx, event);
        }

        match result {
            Ok(()) => debug!("Split finished"),
            Err(e) if e.is_cancelled() => debug!("Split stopped"),
            Err(e) => {
                warn!(track = e.track(), error = %e, "Split failed");
                ctx.error(e.track(), e.to_string());
            }
        }
    }
}
