//! Snapshot and record structures.
//!
//! A `Snapshot` is the in-memory result of one run. Each of its outcomes is
//! written as one self-contained `Record`, one JSON object per line.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::facts::Facts;
use super::outcome::{CollectorKind, Outcome, OutcomeStatus};

/// Version of the record format. Bumped on incompatible changes.
pub const SCHEMA_VERSION: u32 = 1;

/// A point-in-time capture of every enabled collector.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub schema_version: u32,
    pub host_id: String,
    /// Set once before any collector runs.
    pub captured_at: DateTime<Utc>,
    /// One outcome per enabled collector, in registry order.
    pub outcomes: Vec<Outcome>,
}

impl Snapshot {
    /// Converts the snapshot into its records, preserving outcome order.
    pub fn records(&self) -> Vec<Record> {
        let captured_at_utc = self.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.outcomes
            .iter()
            .enumerate()
            .map(|(seq, outcome)| Record {
                schema_version: self.schema_version,
                host_id: self.host_id.clone(),
                captured_at_utc: captured_at_utc.clone(),
                seq: seq as u32,
                probe_version: env!("CARGO_PKG_VERSION").to_string(),
                kind: outcome.kind,
                status: outcome.status,
                duration_ms: outcome.duration_ms,
                facts: outcome.facts.clone(),
                error: outcome.error.clone(),
            })
            .collect()
    }
}

/// One line of the output stream.
///
/// Carries the run metadata so any single line can be interpreted alone.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub schema_version: u32,
    pub host_id: String,
    /// ISO-8601 UTC, millisecond precision.
    pub captured_at_utc: String,
    /// Position of this record within its run.
    pub seq: u32,
    pub probe_version: String,
    pub kind: CollectorKind,
    pub status: OutcomeStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<Facts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Record {
    /// Parses one line of the stream.
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Rebuilds the outcome this record was written from.
    pub fn to_outcome(&self) -> Outcome {
        Outcome {
            kind: self.kind,
            status: self.status,
            facts: self.facts.clone(),
            error: self.error.clone(),
            duration_ms: self.duration_ms,
        }
    }
}
