//! Fact collectors.
//!
//! Each collector gathers one category of facts and reports it as an
//! [`Outcome`]. Collectors never return `Err` and never panic on purpose:
//! anything that goes wrong on the way ends up in the outcome's status and
//! error text. All host reads go through [`FileSystem`], so every collector
//! runs against [`MockFs`] in tests.
//!
//! ```text
//! CollectorRegistry ──► [System, Filesystem, Process, Package, Network, AppRoutes?]
//!                              │
//!                              ▼  collect(&ProbeConfig)
//!                           Outcome ──► SnapshotAssembler
//! ```

pub mod app_routes;
pub mod filesystem;
pub mod mock;
pub mod package;
pub mod procfs;
pub mod registry;
pub mod traits;

pub use app_routes::AppRoutesCollector;
pub use filesystem::FilesystemCollector;
pub use mock::MockFs;
pub use package::PackageCollector;
pub use procfs::{NetworkCollector, ProcessCollector, SystemCollector, host_identity};
pub use registry::CollectorRegistry;
pub use traits::{EntryKind, FileMeta, FileSystem, RealFs};

use crate::config::ProbeConfig;
use crate::storage::model::{CollectorKind, Outcome};

/// A source of one category of facts.
///
/// Implementations are shared across threads and invoked at most once per
/// run. They must only read host state.
pub trait FactCollector: Send + Sync {
    /// Category this collector reports under.
    fn kind(&self) -> CollectorKind;

    /// Gathers facts. The returned outcome's `kind` must equal `self.kind()`.
    fn collect(&self, config: &ProbeConfig) -> Outcome;
}
