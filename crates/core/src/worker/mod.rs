//! Worker execution model.
//!
//! A [`Worker`] is a unit of long-running work (splitting a disc image or
//! encoding one track). Each worker is moved onto its own dedicated thread,
//! a [`WorkerThread`], which owns it until the thread exits. Workers report
//! back only through a one-way channel of [`WorkerMessage`]s and are asked to
//! stop through a [`StopSignal`] watch.

mod thread;
mod types;

pub use thread::{Worker, WorkerContext, WorkerThread, DEFAULT_STOP_GRACE};
pub use types::{PipelineId, StopSignal, WorkerEvent, WorkerId, WorkerKind, WorkerMessage};
