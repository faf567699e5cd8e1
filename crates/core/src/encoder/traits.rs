//! Trait definitions for the encoder module.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use super::error::EncoderError;
use super::types::{EncodeJob, EncodeOutput};
use crate::worker::StopSignal;

/// An encoder that turns one decoded track into an output file.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Returns the name of this encoder implementation.
    fn name(&self) -> &str;

    /// Encodes `job`, sending progress percentages to `progress_tx`.
    ///
    /// When `job.measure_gain` is set the output carries the track's
    /// replay-gain measurement. A stop request ends the encode with an
    /// error for which [`EncoderError::is_cancelled`] holds.
    async fn encode(
        &self,
        job: EncodeJob,
        progress_tx: mpsc::Sender<u8>,
        stop: watch::Receiver<StopSignal>,
    ) -> Result<EncodeOutput, EncoderError>;
}
