//! Moving finished files to their destination.

mod error;
mod fs_finalizer;

pub use error::FinalizeError;
pub use fs_finalizer::{FsFinalizer, Finalizer};
