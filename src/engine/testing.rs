//! Stub collectors for engine tests.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::collector::{CollectorRegistry, FactCollector};
use crate::config::ProbeConfig;
use crate::storage::model::{CollectorKind, Facts, Outcome};

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Ok,
    Delay(Duration),
    Panic,
    WrongKind,
}

pub struct StubCollector {
    kind: CollectorKind,
    behavior: Behavior,
}

impl StubCollector {
    pub fn new(kind: CollectorKind, behavior: Behavior) -> Self {
        Self { kind, behavior }
    }
}

impl FactCollector for StubCollector {
    fn kind(&self) -> CollectorKind {
        self.kind
    }

    fn collect(&self, _config: &ProbeConfig) -> Outcome {
        let mut facts = Facts::new();
        facts.insert("stub".to_string(), true.into());

        match self.behavior {
            Behavior::Ok => {}
            Behavior::Delay(delay) => thread::sleep(delay),
            Behavior::Panic => panic!("stub fault in {}", self.kind),
            Behavior::WrongKind => return Outcome::ok(CollectorKind::System, facts),
        }
        Outcome::ok(self.kind, facts)
    }
}

pub fn stub_registry(spec: &[(CollectorKind, Behavior)]) -> CollectorRegistry {
    CollectorRegistry::with_collectors(
        spec.iter()
            .map(|&(kind, behavior)| {
                Arc::new(StubCollector::new(kind, behavior)) as Arc<dyn FactCollector>
            })
            .collect(),
    )
}
