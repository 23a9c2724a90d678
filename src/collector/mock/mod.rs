//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built host scenarios for testing
//! collectors without access to a real Linux host.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
pub use scenarios::TYPICAL_BTIME;
