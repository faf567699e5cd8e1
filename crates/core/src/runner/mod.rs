//! Multi-disc conversion runner.
//!
//! Drives any number of [`DiscPipeline`](crate::pipeline::DiscPipeline)s
//! from one task:
//! - Slots: one split and encode budget shared by every disc
//! - Messages: worker reports are routed to their pipeline by id
//! - Stop: an external request cancels every disc still running

mod runner;
mod types;

pub use runner::{ConversionRunner, StopHandle};
pub use types::{DiscSummary, RunSummary};
