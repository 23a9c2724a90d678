//! Collectors backed by the proc filesystem.

pub mod network;
pub mod parser;
pub mod process;
pub mod system;

pub use network::NetworkCollector;
pub use process::{ProcessCollector, ProcessEntry};
pub use system::{SystemCollector, host_identity};
