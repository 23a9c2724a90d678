//! Utility modules for hostprobe.

pub mod command;
mod container;
mod time;

pub use container::is_container;
pub use time::epoch_to_iso;
