//! Resolution of an `AppSpec` into a `RouteSource`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::{AppSpec, ManifestSource, OpenApiSource, RouteSource};
use crate::collector::traits::FileSystem;
use crate::error::ProbeError;

/// Turns an application spec into something that can enumerate routes.
pub trait RouteResolver: Send + Sync {
    fn resolve(&self, spec: &AppSpec, root: &Path) -> Result<Box<dyn RouteSource>, ProbeError>;
}

/// In-process applications addressable as `<module>:<attr>`.
#[derive(Default, Clone)]
pub struct AppRegistry {
    entries: HashMap<String, Arc<dyn RouteSource>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` under `entry` (e.g. `"shop.api:app"`).
    pub fn register(&mut self, entry: impl Into<String>, source: impl RouteSource + 'static) {
        self.entries.insert(entry.into(), Arc::new(source));
    }

    pub fn with(mut self, entry: impl Into<String>, source: impl RouteSource + 'static) -> Self {
        self.register(entry, source);
        self
    }

    pub fn get(&self, entry: &str) -> Option<Arc<dyn RouteSource>> {
        self.entries.get(entry).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Default resolver: documents are read through `FileSystem`, entry
/// references are looked up in an `AppRegistry`.
pub struct AppResolver<F: FileSystem> {
    fs: F,
    registry: AppRegistry,
}

impl<F: FileSystem> AppResolver<F> {
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            registry: AppRegistry::new(),
        }
    }

    pub fn with_registry(mut self, registry: AppRegistry) -> Self {
        self.registry = registry;
        self
    }

    fn read_document(&self, path: &Path) -> Result<String, ProbeError> {
        self.fs
            .read_to_string(path)
            .map_err(|e| ProbeError::from_io(path.display(), e))
    }
}

impl<F: FileSystem> RouteResolver for AppResolver<F> {
    fn resolve(&self, spec: &AppSpec, root: &Path) -> Result<Box<dyn RouteSource>, ProbeError> {
        debug!(spec = %spec, "resolving application");
        match spec {
            AppSpec::OpenApi(_) | AppSpec::Manifest(_) => {
                let path = spec.document_path(root).ok_or_else(|| {
                    ProbeError::ResolutionError(format!("{}: no document path", spec))
                })?;
                let content = self.read_document(&path)?;
                let origin = path.display().to_string();
                if matches!(spec, AppSpec::OpenApi(_)) {
                    Ok(Box::new(OpenApiSource::from_json(origin, &content)?))
                } else {
                    Ok(Box::new(ManifestSource::from_json(origin, &content)?))
                }
            }
            AppSpec::Entry { .. } => {
                let key = spec.to_string();
                let source = self.registry.get(&key).ok_or_else(|| {
                    ProbeError::ResolutionError(format!("no application registered as {}", key))
                })?;
                Ok(Box::new(source))
            }
        }
    }
}
