//! Trait definitions for the splitter module.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use super::error::SplitterError;
use super::types::{SplitEvent, SplitJob};
use crate::worker::StopSignal;

/// Cuts a disc image into one decoded file per track.
#[async_trait]
pub trait Splitter: Send + Sync {
    /// Returns the name of this splitter implementation.
    fn name(&self) -> &str;

    /// Splits every region of `job`.
    ///
    /// Each finished track is reported exactly once on `events` as soon as
    /// its file is complete. An error aborts the whole split.
    async fn split(
        &self,
        job: SplitJob,
        events: mpsc::UnboundedSender<SplitEvent>,
        stop: watch::Receiver<StopSignal>,
    ) -> Result<(), SplitterError>;
}
