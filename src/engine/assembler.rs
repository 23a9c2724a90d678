//! Snapshot assembly.
//!
//! Every collector runs on its own worker thread behind `catch_unwind`, so a
//! panicking collector becomes a `Failed` outcome and a hanging one is cut
//! off at the deadline. Results come back over a channel tagged with the
//! collector's registry index and are slotted in place, which keeps the
//! outcome order independent of completion order.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::collector::{CollectorRegistry, FactCollector};
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::storage::model::{Facts, Outcome, OutcomeStatus, SCHEMA_VERSION, Snapshot};

type Slot = (usize, Outcome);

/// Runs collectors and assembles their outcomes into a `Snapshot`.
pub struct SnapshotAssembler {
    host_id: String,
}

impl SnapshotAssembler {
    pub fn new(host_id: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
        }
    }

    /// Invokes every registered collector exactly once.
    ///
    /// Never fails: collectors that panic, hang or cannot be started are
    /// represented by `Failed` outcomes.
    pub fn assemble(&self, registry: &CollectorRegistry, config: &Arc<ProbeConfig>) -> Snapshot {
        let captured_at = Utc::now();
        let collectors = registry.collectors();
        let mut slots: Vec<Option<Outcome>> = vec![None; collectors.len()];

        if config.parallel {
            let batch: Vec<usize> = (0..collectors.len()).collect();
            run_batch(collectors, &batch, config, &mut slots);
        } else {
            for index in 0..collectors.len() {
                run_batch(collectors, &[index], config, &mut slots);
            }
        }

        let outcomes = slots
            .into_iter()
            .zip(collectors)
            .map(|(slot, collector)| {
                slot.unwrap_or_else(|| {
                    Outcome::failed(collector.kind(), "collector produced no outcome")
                })
            })
            .collect();

        Snapshot {
            schema_version: SCHEMA_VERSION,
            host_id: self.host_id.clone(),
            captured_at,
            outcomes,
        }
    }
}

/// Starts the collectors at `batch` and waits for them until the shared
/// deadline. Outcomes arriving after the deadline are dropped with the
/// receiver.
fn run_batch(
    collectors: &[Arc<dyn FactCollector>],
    batch: &[usize],
    config: &Arc<ProbeConfig>,
    slots: &mut [Option<Outcome>],
) {
    let timeout = config.collector_timeout;
    let deadline = Instant::now() + timeout;
    let (tx, rx) = mpsc::channel::<Slot>();

    let mut pending = 0;
    for &index in batch {
        let collector = &collectors[index];
        match spawn_collector(index, collector.clone(), config.clone(), tx.clone()) {
            Ok(()) => pending += 1,
            Err(e) => {
                warn!(kind = %collector.kind(), error = %e, "cannot start collector thread");
                slots[index] = Some(Outcome::from_parts(
                    collector.kind(),
                    Facts::new(),
                    vec![ProbeError::Io(e)],
                ));
            }
        }
    }
    drop(tx);

    while pending > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((index, outcome)) => {
                if slots[index].is_none() {
                    slots[index] = Some(outcome);
                    pending -= 1;
                }
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for &index in batch {
        if slots[index].is_none() {
            let kind = collectors[index].kind();
            warn!(kind = %kind, timeout_ms = timeout.as_millis() as u64, "collector timed out");
            slots[index] = Some(timed_out(collectors[index].as_ref(), timeout));
        }
    }
}

fn timed_out(collector: &dyn FactCollector, timeout: Duration) -> Outcome {
    let kind = collector.kind();
    Outcome::from_parts(
        kind,
        Facts::new(),
        vec![ProbeError::Timeout(format!(
            "{} collector did not finish within {} ms",
            kind,
            timeout.as_millis()
        ))],
    )
    .with_duration_ms(timeout.as_millis() as u64)
}

fn spawn_collector(
    index: usize,
    collector: Arc<dyn FactCollector>,
    config: Arc<ProbeConfig>,
    tx: Sender<Slot>,
) -> std::io::Result<()> {
    let kind = collector.kind();
    thread::Builder::new()
        .name(format!("collect-{}", kind.as_str().to_ascii_lowercase()))
        .spawn(move || {
            debug!(kind = %kind, "collector started");
            let start = Instant::now();
            let outcome = run_guarded(collector.as_ref(), &config)
                .with_duration_ms(start.elapsed().as_millis() as u64);

            match outcome.status {
                OutcomeStatus::Ok => {
                    debug!(kind = %kind, elapsed_ms = outcome.duration_ms, "collector finished")
                }
                _ => warn!(
                    kind = %kind,
                    status = %outcome.status,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "collector degraded"
                ),
            }
            // Receiver is gone once the deadline passed.
            let _ = tx.send((index, outcome));
        })?;
    Ok(())
}

/// Calls `collect`, turning a panic or a mislabeled outcome into `Failed`.
fn run_guarded(collector: &dyn FactCollector, config: &ProbeConfig) -> Outcome {
    let kind = collector.kind();
    match panic::catch_unwind(AssertUnwindSafe(|| collector.collect(config))) {
        Ok(outcome) if outcome.kind == kind => outcome,
        Ok(outcome) => Outcome::failed(
            kind,
            format!("collector reported kind {} instead of {}", outcome.kind, kind),
        ),
        Err(payload) => Outcome::failed(
            kind,
            format!("collector panicked: {}", panic_message(payload.as_ref())),
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{Behavior, StubCollector, stub_registry};
    use crate::storage::model::CollectorKind;

    fn config(parallel: bool) -> Arc<ProbeConfig> {
        Arc::new(
            ProbeConfig::new("/srv/app")
                .with_parallel(parallel)
                .with_collector_timeout(Duration::from_millis(300)),
        )
    }

    fn kinds(snapshot: &Snapshot) -> Vec<CollectorKind> {
        snapshot.outcomes.iter().map(|o| o.kind).collect()
    }

    #[test]
    fn test_order_independent_of_completion() {
        let registry = stub_registry(&[
            (CollectorKind::System, Behavior::Delay(Duration::from_millis(120))),
            (CollectorKind::Filesystem, Behavior::Delay(Duration::from_millis(60))),
            (CollectorKind::Process, Behavior::Ok),
            (CollectorKind::Package, Behavior::Delay(Duration::from_millis(30))),
            (CollectorKind::Network, Behavior::Ok),
        ]);

        for parallel in [true, false] {
            let snapshot = SnapshotAssembler::new("host").assemble(&registry, &config(parallel));
            assert_eq!(kinds(&snapshot), CollectorKind::ALL[..5].to_vec());
            assert!(
                snapshot
                    .outcomes
                    .iter()
                    .all(|o| o.status == OutcomeStatus::Ok)
            );
        }
    }

    #[test]
    fn test_panicking_collector_is_failed() {
        let registry = stub_registry(&[
            (CollectorKind::System, Behavior::Ok),
            (CollectorKind::Filesystem, Behavior::Panic),
            (CollectorKind::Process, Behavior::Ok),
        ]);
        let snapshot = SnapshotAssembler::new("host").assemble(&registry, &config(true));

        let faulty = &snapshot.outcomes[1];
        assert_eq!(faulty.status, OutcomeStatus::Failed);
        assert!(faulty.error.as_deref().unwrap().contains("stub fault"));
        assert_eq!(snapshot.outcomes[0].status, OutcomeStatus::Ok);
        assert_eq!(snapshot.outcomes[2].status, OutcomeStatus::Ok);
    }

    #[test]
    fn test_hanging_collector_times_out() {
        let registry = stub_registry(&[
            (CollectorKind::System, Behavior::Ok),
            (CollectorKind::Network, Behavior::Delay(Duration::from_secs(5))),
        ]);

        for parallel in [true, false] {
            let start = Instant::now();
            let snapshot = SnapshotAssembler::new("host").assemble(&registry, &config(parallel));
            assert!(start.elapsed() < Duration::from_secs(3));

            let hung = &snapshot.outcomes[1];
            assert_eq!(hung.status, OutcomeStatus::Failed);
            assert!(hung.error.as_deref().unwrap().starts_with("Timeout"));
            assert_eq!(snapshot.outcomes[0].status, OutcomeStatus::Ok);
        }
    }

    #[test]
    fn test_mislabeled_outcome_is_failed() {
        let registry = CollectorRegistry::with_collectors(vec![Arc::new(StubCollector::new(
            CollectorKind::Package,
            Behavior::WrongKind,
        ))]);
        let snapshot = SnapshotAssembler::new("host").assemble(&registry, &config(true));
        assert_eq!(snapshot.outcomes[0].kind, CollectorKind::Package);
        assert_eq!(snapshot.outcomes[0].status, OutcomeStatus::Failed);
    }

    #[test]
    fn test_metadata_set_once() {
        let registry = stub_registry(&[(CollectorKind::System, Behavior::Ok)]);
        let before = Utc::now();
        let snapshot = SnapshotAssembler::new("edge-01").assemble(&registry, &config(true));

        assert_eq!(snapshot.host_id, "edge-01");
        assert_eq!(snapshot.schema_version, SCHEMA_VERSION);
        assert!(snapshot.captured_at >= before);
        assert!(snapshot.captured_at <= Utc::now());
    }
}
