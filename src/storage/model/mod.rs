//! Data model for probe results.
//!
//! - `facts`: fact values (scalars, lists, nested maps)
//! - `outcome`: per-collector result with its three-valued status
//! - `snapshot`: assembled run result and its self-describing records

mod facts;
mod outcome;
mod snapshot;

pub use facts::{FactValue, Facts};
pub use outcome::{CollectorKind, Outcome, OutcomeStatus};
pub use snapshot::{Record, SCHEMA_VERSION, Snapshot};
