//! hostprobe - read-only host state capture.
//!
//! One invocation gathers facts from independent collectors (system,
//! filesystem, process, package, network and, optionally, an
//! application's route table), assembles them into a single snapshot and
//! appends it to a JSONL stream, one self-contained record per collector.
//!
//! The `hostprobe` binary is a thin wrapper: it builds a `ProbeConfig`,
//! runs a `Probe` and turns the `RunReport` into an exit code.

pub mod app;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod storage;
pub mod util;

pub use config::{OutputSink, ProbeConfig};
pub use engine::{OverallStatus, Probe, RunPhase, RunReport};
pub use error::ProbeError;
