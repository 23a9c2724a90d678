//! Run configuration.
//!
//! `ProbeConfig` is built once per invocation and shared read-only (behind
//! an `Arc`) with every collector thread.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::util::command::CommandLimits;

/// Destination of the record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// Append to a file, creating it if needed.
    File(PathBuf),
    Stdout,
}

impl OutputSink {
    /// Parses a CLI value: `-` means stdout, anything else is a file path.
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            OutputSink::Stdout
        } else {
            OutputSink::File(PathBuf::from(value))
        }
    }
}

/// Makes `root` absolute, resolving symlinks when it exists.
///
/// Mount points are absolute, so a relative root could never be matched
/// against the mount table.
pub fn resolve_root(root: &Path) -> PathBuf {
    std::fs::canonicalize(root)
        .or_else(|_| std::path::absolute(root))
        .unwrap_or_else(|_| root.to_path_buf())
}

/// Immutable configuration of one probe run.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Scope of the filesystem and package collectors. Always absolute.
    pub root: PathBuf,
    /// Application to introspect for routes. `None` disables AppRoutes.
    pub app_spec: Option<String>,
    pub sink: OutputSink,
    /// Base path of the proc filesystem (usually "/proc").
    pub proc_path: PathBuf,
    /// Base path of host configuration (usually "/etc").
    pub etc_path: PathBuf,
    /// Budget of one collector invocation.
    pub collector_timeout: Duration,
    /// Run collectors on concurrent threads instead of one after another.
    pub parallel: bool,
    /// Capture raw output of read-only system commands.
    pub run_commands: bool,
    pub command_limits: CommandLimits,
    /// Maximum directory depth walked below `root`.
    pub max_depth: usize,
    /// Maximum number of entries reported by the filesystem collector.
    pub max_entries: usize,
    /// Regular files up to this size get a content fingerprint.
    pub hash_limit_bytes: u64,
}

impl ProbeConfig {
    pub const DEFAULT_COLLECTOR_TIMEOUT: Duration = Duration::from_secs(90);
    pub const DEFAULT_MAX_DEPTH: usize = 4;
    pub const DEFAULT_MAX_ENTRIES: usize = 5_000;
    pub const DEFAULT_HASH_LIMIT: u64 = 64 * 1024;

    /// Creates a configuration with defaults for everything but the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: resolve_root(&root.into()),
            app_spec: None,
            sink: OutputSink::Stdout,
            proc_path: PathBuf::from("/proc"),
            etc_path: PathBuf::from("/etc"),
            collector_timeout: Self::DEFAULT_COLLECTOR_TIMEOUT,
            parallel: true,
            run_commands: true,
            command_limits: CommandLimits::default(),
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_entries: Self::DEFAULT_MAX_ENTRIES,
            hash_limit_bytes: Self::DEFAULT_HASH_LIMIT,
        }
    }

    /// Sets the application spec. Blank values leave AppRoutes disabled.
    pub fn with_app_spec(mut self, spec: impl Into<String>) -> Self {
        let spec = spec.into();
        self.app_spec = if spec.trim().is_empty() {
            None
        } else {
            Some(spec.trim().to_string())
        };
        self
    }

    pub fn with_sink(mut self, sink: OutputSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_proc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.proc_path = path.into();
        self
    }

    pub fn with_etc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.etc_path = path.into();
        self
    }

    pub fn with_collector_timeout(mut self, timeout: Duration) -> Self {
        self.collector_timeout = timeout;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_commands(mut self, run_commands: bool) -> Self {
        self.run_commands = run_commands;
        self
    }

    pub fn with_command_limits(mut self, limits: CommandLimits) -> Self {
        self.command_limits = limits;
        self
    }

    pub fn with_walk_limits(mut self, max_depth: usize, max_entries: usize) -> Self {
        self.max_depth = max_depth;
        self.max_entries = max_entries;
        self
    }

    /// True when the AppRoutes collector is enabled.
    pub fn app_routes_enabled(&self) -> bool {
        self.app_spec.is_some()
    }
}
