//! Probe result model and the record stream writer.

pub mod emitter;
pub mod model;

pub use emitter::RecordEmitter;
pub use model::{Record, Snapshot};
