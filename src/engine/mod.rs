//! Probe engine.
//!
//! One run is a single linear pass:
//!
//! ```text
//! Configured ──► Collecting ──► Assembled ──► Emitted ──► Reported
//!     │ (sink unopenable)                                    ▲
//!     └──────────────────────────────────────────────────────┘
//! ```
//!
//! The sink is opened before collection starts; a sink that cannot be
//! opened aborts the run because nothing could be recorded. Everything
//! else (collector faults, timeouts, an unusable root) is folded into the
//! snapshot and the report.

mod assembler;
mod report;
#[cfg(test)]
mod testing;

pub use assembler::SnapshotAssembler;
pub use report::{CollectorStatus, OverallStatus, RunReport};

use std::io::Write;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::app::RouteResolver;
use crate::collector::traits::{EntryKind, FileSystem};
use crate::collector::{CollectorRegistry, host_identity};
use crate::config::ProbeConfig;
use crate::storage::RecordEmitter;

/// Lifecycle of one run. No phase is entered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    Configured,
    Collecting,
    Assembled,
    Emitted,
    Reported,
}

/// Checks that `root` exists, is a directory and can be listed.
pub fn validate_root<F: FileSystem>(fs: &F, config: &ProbeConfig) -> Result<(), String> {
    let root = &config.root;
    let meta = fs
        .metadata(root)
        .map_err(|e| format!("root {} is unreachable: {}", root.display(), e))?;
    if meta.kind != EntryKind::Dir {
        return Err(format!(
            "root {} is not a directory ({})",
            root.display(),
            meta.kind.as_str()
        ));
    }
    fs.read_dir(root)
        .map_err(|e| format!("root {} is unreadable: {}", root.display(), e))?;
    Ok(())
}

/// One probe invocation.
pub struct Probe {
    config: Arc<ProbeConfig>,
    registry: CollectorRegistry,
    host_id: String,
    root_error: Option<String>,
    phase: RunPhase,
}

impl Probe {
    pub fn new(config: ProbeConfig, registry: CollectorRegistry, host_id: impl Into<String>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            host_id: host_id.into(),
            root_error: None,
            phase: RunPhase::Configured,
        }
    }

    /// Standard probe of the host seen through `fs`: builds the registry,
    /// derives the host identity and validates the root.
    pub fn for_host<F>(fs: F, resolver: Arc<dyn RouteResolver>, config: ProbeConfig) -> Self
    where
        F: FileSystem + Clone + 'static,
    {
        let registry = CollectorRegistry::from_config(fs.clone(), resolver, &config);
        let host_id = host_identity(&fs, &config);
        let root_error = validate_root(&fs, &config).err();
        Self {
            root_error,
            ..Self::new(config, registry, host_id)
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn registry(&self) -> &CollectorRegistry {
        &self.registry
    }

    /// Runs against the configured sink.
    pub fn run(&mut self) -> RunReport {
        match RecordEmitter::open(&self.config.sink) {
            Ok(mut emitter) => self.run_with_emitter(&mut emitter),
            Err(e) => {
                error!(error = %e, "output sink unavailable, aborting before collection");
                eprintln!("hostprobe: {}", e);
                self.phase = RunPhase::Reported;
                RunReport::aborted(&self.host_id, "run aborted before collection")
                    .with_sink_error(e.to_string())
            }
        }
    }

    /// Runs and writes records through `emitter`.
    pub fn run_with_emitter<W: Write>(&mut self, emitter: &mut RecordEmitter<W>) -> RunReport {
        if self.phase != RunPhase::Configured {
            return RunReport::aborted(&self.host_id, "probe already ran");
        }

        if let Some(err) = &self.root_error {
            warn!(root = %self.config.root.display(), error = %err, "invalid root");
        }

        self.phase = RunPhase::Collecting;
        let snapshot = SnapshotAssembler::new(&self.host_id).assemble(&self.registry, &self.config);
        self.phase = RunPhase::Assembled;

        let emitted = emitter.emit_snapshot(&snapshot);
        self.phase = RunPhase::Emitted;

        let mut report = RunReport::from_snapshot(&snapshot, emitter.records_written());
        if let Err(e) = emitted {
            error!(error = %e, written = emitter.records_written(), "record stream incomplete");
            eprintln!("hostprobe: {}", e);
            report = report.with_sink_error(e.to_string());
        }
        if let Some(err) = &self.root_error {
            report = report.fail_with(err.clone());
        }
        self.phase = RunPhase::Reported;

        info!(
            overall = %report.overall,
            records = report.records_written,
            collectors = report.collectors.len(),
            "probe run finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    use crate::app::{AppRegistry, AppResolver, StaticApp};
    use crate::collector::mock::MockFs;
    use crate::config::OutputSink;
    use crate::engine::testing::{Behavior, stub_registry};
    use crate::storage::model::{CollectorKind, OutcomeStatus, Record};

    fn config() -> ProbeConfig {
        ProbeConfig::new("/srv/app")
            .with_commands(false)
            .with_collector_timeout(Duration::from_secs(5))
    }

    fn shop_resolver(fs: MockFs) -> Arc<dyn RouteResolver> {
        let app = StaticApp::new("shop")
            .route(&["GET"], "/items", "shop.items.list", |_| String::new())
            .route(&["POST"], "/items", "shop.items.create", |_| String::new())
            .route(&["GET"], "/health", "shop.health", |_| String::new());
        Arc::new(AppResolver::new(fs).with_registry(AppRegistry::new().with("shop.api:app", app)))
    }

    fn run(config: ProbeConfig) -> (RunReport, Vec<Record>) {
        let fs = MockFs::typical_host();
        let mut probe = Probe::for_host(fs.clone(), shop_resolver(fs), config);
        let mut emitter = RecordEmitter::new(Vec::new());
        let report = probe.run_with_emitter(&mut emitter);
        assert_eq!(probe.phase(), RunPhase::Reported);

        let output = String::from_utf8(emitter.into_inner()).unwrap();
        let records = output
            .lines()
            .map(|line| Record::from_line(line).unwrap())
            .collect();
        (report, records)
    }

    #[test]
    fn test_record_count_matches_enabled_collectors() {
        let (report, records) = run(config());
        assert_eq!(records.len(), 5);
        assert_eq!(report.records_written, 5);

        let (_, records) = run(config().with_app_spec("shop.api:app"));
        assert_eq!(records.len(), 6);
        let kinds: Vec<CollectorKind> = records.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, CollectorKind::ALL.to_vec());
    }

    #[test]
    fn test_typical_host_run_is_ok() {
        let (report, records) = run(config().with_app_spec("shop.api:app"));
        assert_eq!(report.overall, OverallStatus::Ok, "{}", report.summary());
        assert_eq!(report.exit_code(), 0);

        let seqs: Vec<u32> = records.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4, 5]);
        assert!(
            records
                .iter()
                .all(|r| r.host_id == "4c4c4544004e3010804cb4c04f4d3732")
        );
        assert!(
            records
                .iter()
                .all(|r| r.captured_at_utc == records[0].captured_at_utc)
        );
    }

    #[test]
    fn test_each_line_reconstructs_its_outcome() {
        let fs = MockFs::typical_host();
        let config = Arc::new(config().with_app_spec("shop.api:app"));
        let registry = CollectorRegistry::from_config(fs.clone(), shop_resolver(fs), &config);
        let snapshot = SnapshotAssembler::new("edge-01").assemble(&registry, &config);

        let mut emitter = RecordEmitter::new(Vec::new());
        emitter.emit_snapshot(&snapshot).unwrap();
        let output = String::from_utf8(emitter.into_inner()).unwrap();

        for (line, outcome) in output.lines().zip(&snapshot.outcomes) {
            let parsed = Record::from_line(line).unwrap().to_outcome();
            assert_eq!(&parsed, outcome);
        }
        assert_eq!(output.lines().count(), snapshot.outcomes.len());
    }

    #[test]
    fn test_unreachable_root_never_ok() {
        let config = ProbeConfig::new("/no/such/root").with_commands(false);
        let (report, records) = run(config);

        assert_eq!(records.len(), 5);
        for kind in [CollectorKind::Filesystem, CollectorKind::Package] {
            assert!(matches!(
                report.status_of(kind),
                Some(OutcomeStatus::Failed | OutcomeStatus::PartialFailure)
            ));
        }
        assert_eq!(report.status_of(CollectorKind::System), Some(OutcomeStatus::Ok));
        assert_eq!(report.overall, OverallStatus::Failed);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].contains("/no/such/root"));
    }

    #[test]
    fn test_unresolvable_app_leaves_others_unaffected() {
        let (baseline, _) = run(config());
        let (report, records) = run(config().with_app_spec("missing.module:app"));

        assert_eq!(records.len(), 6);
        assert_eq!(records[5].kind, CollectorKind::AppRoutes);
        assert_eq!(records[5].status, OutcomeStatus::Failed);
        assert!(records[5].error.as_deref().unwrap().starts_with("ResolutionError"));

        let statuses: Vec<_> = report.collectors[..5].iter().map(|c| c.status).collect();
        let expected: Vec<_> = baseline.collectors.iter().map(|c| c.status).collect();
        assert_eq!(statuses, expected);
        assert_eq!(report.overall, OverallStatus::Degraded);
    }

    #[test]
    fn test_app_routes_listed_once() {
        let (_, records) = run(config().with_app_spec("shop.api:app"));
        let routes = records[5].facts.as_ref().unwrap()["routes"].as_list().unwrap();

        let mut pairs: Vec<(String, String)> = routes
            .iter()
            .map(|r| {
                (
                    r.get("method").and_then(|v| v.as_str()).unwrap().to_string(),
                    r.get("path").and_then(|v| v.as_str()).unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(pairs.len(), 3);
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_faulting_collector_still_reported() {
        let registry = stub_registry(&[
            (CollectorKind::System, Behavior::Ok),
            (CollectorKind::Filesystem, Behavior::Panic),
        ]);
        let mut probe = Probe::new(config(), registry, "edge-01");
        let mut emitter = RecordEmitter::new(Vec::new());
        let report = probe.run_with_emitter(&mut emitter);

        assert_eq!(probe.phase(), RunPhase::Reported);
        assert_eq!(report.overall, OverallStatus::Degraded);
        assert_eq!(report.records_written, 2);
        assert!(!report.collectors[1].error.as_deref().unwrap().is_empty());
    }

    #[test]
    fn test_second_run_refused() {
        let registry = stub_registry(&[(CollectorKind::System, Behavior::Ok)]);
        let mut probe = Probe::new(config(), registry, "edge-01");
        let mut emitter = RecordEmitter::new(Vec::new());

        assert_eq!(probe.run_with_emitter(&mut emitter).exit_code(), 0);
        let again = probe.run_with_emitter(&mut emitter);
        assert_eq!(again.overall, OverallStatus::Failed);
        assert_eq!(emitter.records_written(), 1);
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_write_failure_reported() {
        let registry = stub_registry(&[(CollectorKind::System, Behavior::Ok)]);
        let mut probe = Probe::new(config(), registry, "edge-01");
        let report = probe.run_with_emitter(&mut RecordEmitter::new(BrokenSink));

        assert_eq!(report.records_written, 0);
        assert!(report.sink_error.as_deref().unwrap().contains("pipe closed"));
        assert_eq!(report.exit_code(), RunReport::EXIT_SINK);
    }

    #[test]
    fn test_unopenable_sink_aborts_before_collecting() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::File(dir.path().join("missing/dir/records.jsonl"));
        let registry = stub_registry(&[(CollectorKind::System, Behavior::Panic)]);
        let mut probe = Probe::new(config().with_sink(sink), registry, "edge-01");

        let report = probe.run();
        assert_eq!(probe.phase(), RunPhase::Reported);
        assert!(report.collectors.is_empty());
        assert_eq!(report.exit_code(), RunReport::EXIT_SINK);
    }

    #[test]
    fn test_file_sink_appends_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        for _ in 0..2 {
            let registry = stub_registry(&[
                (CollectorKind::System, Behavior::Ok),
                (CollectorKind::Network, Behavior::Ok),
            ]);
            let config = config().with_sink(OutputSink::File(path.clone()));
            let report = Probe::new(config, registry, "edge-01").run();
            assert_eq!(report.records_written, 2);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
    }
}
