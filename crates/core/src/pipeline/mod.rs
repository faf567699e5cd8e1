//! Disc conversion pipeline.
//!
//! A [`DiscPipeline`] owns the per-track state machine of one disc: it
//! queues the split request, starts split and encode workers as the caller
//! hands it free [`Slots`], writes replay-gain tags (holding every track back
//! until the album figure is known in album mode), moves finished files into
//! place and aborts the whole disc on the first failure.
//!
//! The pipeline is driven from a single thread. Workers never touch it
//! directly; their [`WorkerMessage`](crate::worker::WorkerMessage)s are fed
//! back through [`DiscPipeline::handle_message`].

mod disc_pipeline;
mod error;
mod toolkit;
mod types;

pub use disc_pipeline::{DiscPipeline, PipelineSetup};
pub use error::PipelineError;
pub use toolkit::Toolkit;
pub use types::{EncodeRequest, GainRecord, PipelineEvent, Slots, SplitRequest, TrackState};
