//! Collector outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::facts::{FactValue, Facts};
use crate::error::ProbeError;

/// Category of facts gathered by one collector.
///
/// Declaration order is the fixed registry order.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectorKind {
    /// OS identity, kernel, boot time, CPU/memory totals.
    /// Source: `/proc/sys/kernel/*`, `/proc/stat`, `/proc/meminfo`, `/etc/os-release`
    System,
    /// Entries and mount points under the probe root.
    Filesystem,
    /// Running processes.
    /// Source: `/proc/[pid]/*`
    Process,
    /// Installed packages and dependency manifests under the probe root.
    Package,
    /// Interfaces and listening sockets.
    /// Source: `/proc/net/*`
    Network,
    /// Declared routes of an application.
    AppRoutes,
}

impl CollectorKind {
    /// All kinds in registry order.
    pub const ALL: [CollectorKind; 6] = [
        CollectorKind::System,
        CollectorKind::Filesystem,
        CollectorKind::Process,
        CollectorKind::Package,
        CollectorKind::Network,
        CollectorKind::AppRoutes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CollectorKind::System => "System",
            CollectorKind::Filesystem => "Filesystem",
            CollectorKind::Process => "Process",
            CollectorKind::Package => "Package",
            CollectorKind::Network => "Network",
            CollectorKind::AppRoutes => "AppRoutes",
        }
    }
}

impl fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result status of one collector invocation.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum OutcomeStatus {
    Ok,
    PartialFailure,
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "Ok",
            OutcomeStatus::PartialFailure => "PartialFailure",
            OutcomeStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one collector produced in one run.
///
/// `facts` is present for `Ok`/`PartialFailure`, `error` for
/// `PartialFailure`/`Failed`. Use the constructors to keep that invariant.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Outcome {
    pub kind: CollectorKind,
    pub status: OutcomeStatus,
    pub facts: Option<Facts>,
    pub error: Option<String>,
    /// Wall-clock time spent in the collector.
    pub duration_ms: u64,
}

impl Outcome {
    pub fn ok(kind: CollectorKind, facts: Facts) -> Self {
        Self {
            kind,
            status: OutcomeStatus::Ok,
            facts: Some(facts),
            error: None,
            duration_ms: 0,
        }
    }

    pub fn partial(kind: CollectorKind, facts: Facts, error: impl Into<String>) -> Self {
        Self {
            kind,
            status: OutcomeStatus::PartialFailure,
            facts: Some(facts),
            error: Some(non_empty(error.into())),
            duration_ms: 0,
        }
    }

    pub fn failed(kind: CollectorKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            status: OutcomeStatus::Failed,
            facts: None,
            error: Some(non_empty(error.into())),
            duration_ms: 0,
        }
    }

    /// Builds an outcome from whatever was gathered plus the errors hit on
    /// the way: no errors is `Ok`, errors with at least one fact is
    /// `PartialFailure`, errors and nothing gathered is `Failed`.
    pub fn from_parts(kind: CollectorKind, facts: Facts, errors: Vec<ProbeError>) -> Self {
        if errors.is_empty() {
            return Self::ok(kind, facts);
        }

        let message = errors
            .iter()
            .map(|e| format!("{}: {}", e.label(), e))
            .collect::<Vec<_>>()
            .join("; ");

        if facts.is_empty() {
            Self::failed(kind, message)
        } else {
            Self::partial(kind, facts, message)
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Looks up a top-level fact.
    pub fn fact(&self, name: &str) -> Option<&FactValue> {
        self.facts.as_ref().and_then(|f| f.get(name))
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        "unspecified failure".to_string()
    } else {
        message
    }
}
