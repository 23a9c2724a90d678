//! Run summary.

use std::fmt;

use crate::storage::model::{CollectorKind, Outcome, OutcomeStatus, Snapshot};

/// Overall status of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    /// Every collector returned `Ok`.
    Ok,
    /// Mixed results.
    Degraded,
    /// Every collector failed, or the run could not proceed.
    Failed,
}

impl OverallStatus {
    /// Worst-first aggregation of per-collector statuses.
    pub fn from_statuses(statuses: impl IntoIterator<Item = OutcomeStatus>) -> Self {
        let (mut total, mut ok, mut failed) = (0, 0, 0);
        for status in statuses {
            total += 1;
            match status {
                OutcomeStatus::Ok => ok += 1,
                OutcomeStatus::Failed => failed += 1,
                OutcomeStatus::PartialFailure => {}
            }
        }

        if total == 0 || failed == total {
            OverallStatus::Failed
        } else if ok == total {
            OverallStatus::Ok
        } else {
            OverallStatus::Degraded
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::Ok => "Ok",
            OverallStatus::Degraded => "Degraded",
            OverallStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-collector line of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorStatus {
    pub kind: CollectorKind,
    pub status: OutcomeStatus,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl From<&Outcome> for CollectorStatus {
    fn from(outcome: &Outcome) -> Self {
        Self {
            kind: outcome.kind,
            status: outcome.status,
            error: outcome.error.clone(),
            duration_ms: outcome.duration_ms,
        }
    }
}

/// Summary handed back to the caller after a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub host_id: String,
    /// Per-collector statuses in registry order. Empty when the run
    /// aborted before collecting.
    pub collectors: Vec<CollectorStatus>,
    pub overall: OverallStatus,
    pub records_written: usize,
    /// Run-level problems that are not tied to one collector.
    pub diagnostics: Vec<String>,
    /// Set when the sink could not be opened or written.
    pub sink_error: Option<String>,
}

impl RunReport {
    pub const EXIT_OK: u8 = 0;
    pub const EXIT_DEGRADED: u8 = 1;
    pub const EXIT_FAILED: u8 = 2;
    pub const EXIT_SINK: u8 = 3;

    /// Builds the report of an assembled and emitted snapshot.
    pub fn from_snapshot(snapshot: &Snapshot, records_written: usize) -> Self {
        Self {
            host_id: snapshot.host_id.clone(),
            collectors: snapshot.outcomes.iter().map(CollectorStatus::from).collect(),
            overall: OverallStatus::from_statuses(snapshot.outcomes.iter().map(|o| o.status)),
            records_written,
            diagnostics: Vec::new(),
            sink_error: None,
        }
    }

    /// Report of a run that stopped before collecting.
    pub fn aborted(host_id: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
            collectors: Vec::new(),
            overall: OverallStatus::Failed,
            records_written: 0,
            diagnostics: vec![diagnostic.into()],
            sink_error: None,
        }
    }

    pub fn with_sink_error(mut self, error: impl Into<String>) -> Self {
        self.sink_error = Some(error.into());
        self
    }

    /// Adds a diagnostic that invalidates the run as a whole.
    pub fn fail_with(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostics.push(diagnostic.into());
        self.overall = OverallStatus::Failed;
        self
    }

    pub fn status_of(&self, kind: CollectorKind) -> Option<OutcomeStatus> {
        self.collectors
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.status)
    }

    /// Process exit code: 0 ok, 1 degraded, 2 failed, 3 sink failure.
    pub fn exit_code(&self) -> u8 {
        if self.sink_error.is_some() {
            return Self::EXIT_SINK;
        }
        match self.overall {
            OverallStatus::Ok => Self::EXIT_OK,
            OverallStatus::Degraded => Self::EXIT_DEGRADED,
            OverallStatus::Failed => Self::EXIT_FAILED,
        }
    }

    /// One-line summary for the console.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "hostprobe: {} host={} records={}",
            self.overall, self.host_id, self.records_written
        );
        for c in &self.collectors {
            line.push_str(&format!(" {}={}", c.kind, c.status));
        }
        if let Some(err) = &self.sink_error {
            line.push_str(&format!(" sink_error=\"{}\"", err));
        }
        for d in &self.diagnostics {
            line.push_str(&format!(" diagnostic=\"{}\"", d));
        }
        line
    }
}
