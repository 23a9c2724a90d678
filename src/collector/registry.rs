//! Ordered list of enabled collectors.

use std::sync::Arc;

use crate::app::RouteResolver;
use crate::collector::{
    AppRoutesCollector, FactCollector, FilesystemCollector, NetworkCollector, PackageCollector,
    ProcessCollector, SystemCollector,
};
use crate::collector::traits::FileSystem;
use crate::config::ProbeConfig;
use crate::storage::model::CollectorKind;

/// Enabled collectors in fixed registry order.
#[derive(Clone)]
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn FactCollector>>,
}

impl CollectorRegistry {
    /// Builds the standard set: System, Filesystem, Process, Package,
    /// Network, plus AppRoutes when an application spec is configured.
    pub fn from_config<F>(fs: F, resolver: Arc<dyn RouteResolver>, config: &ProbeConfig) -> Self
    where
        F: FileSystem + Clone + 'static,
    {
        let mut collectors: Vec<Arc<dyn FactCollector>> = vec![
            Arc::new(SystemCollector::new(fs.clone())),
            Arc::new(FilesystemCollector::new(fs.clone())),
            Arc::new(ProcessCollector::new(fs.clone())),
            Arc::new(PackageCollector::new(fs.clone())),
            Arc::new(NetworkCollector::new(fs)),
        ];
        if config.app_routes_enabled() {
            collectors.push(Arc::new(AppRoutesCollector::new(resolver)));
        }
        Self { collectors }
    }

    /// Uses the given collectors as-is, in the given order.
    pub fn with_collectors(collectors: Vec<Arc<dyn FactCollector>>) -> Self {
        Self { collectors }
    }

    pub fn collectors(&self) -> &[Arc<dyn FactCollector>] {
        &self.collectors
    }

    pub fn kinds(&self) -> Vec<CollectorKind> {
        self.collectors.iter().map(|c| c.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}
