//! JSON route manifest adapter.
//!
//! Accepted shapes:
//! ```text
//! [{"method": "GET", "path": "/items", "handler": "shop.items.list"}, ...]
//! {"routes": [{"methods": ["GET", "HEAD"], "path": "/", "handler": "index"}]}
//! ```

use serde::Deserialize;

use super::{Route, RouteSource, expand_methods};
use crate::error::ProbeError;

#[derive(Debug, Clone, Deserialize)]
struct ManifestRoute {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    methods: Vec<String>,
    path: String,
    #[serde(default)]
    handler: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestDocument {
    List(Vec<ManifestRoute>),
    Wrapped { routes: Vec<ManifestRoute> },
}

/// Routes listed in a JSON manifest, in declaration order.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    origin: String,
    entries: Vec<ManifestRoute>,
}

impl ManifestSource {
    pub fn from_json(origin: impl Into<String>, content: &str) -> Result<Self, ProbeError> {
        let origin = origin.into();
        let document: ManifestDocument = serde_json::from_str(content).map_err(|e| {
            ProbeError::ResolutionError(format!("{}: invalid route manifest: {}", origin, e))
        })?;
        let entries = match document {
            ManifestDocument::List(entries) | ManifestDocument::Wrapped { routes: entries } => {
                entries
            }
        };
        Ok(Self { origin, entries })
    }
}

impl RouteSource for ManifestSource {
    fn describe(&self) -> String {
        format!("route manifest ({})", self.origin)
    }

    fn routes(&self) -> Result<Vec<Route>, ProbeError> {
        let mut routes = Vec::new();
        for entry in &self.entries {
            let mut methods: Vec<&str> = entry.methods.iter().map(String::as_str).collect();
            if let Some(method) = entry.method.as_deref() {
                methods.push(method);
            }
            if methods.is_empty() {
                return Err(ProbeError::ResolutionError(format!(
                    "{}: route {} declares no method",
                    self.origin, entry.path
                )));
            }

            let handler = entry.handler.clone().unwrap_or_else(|| entry.path.clone());
            routes.extend(expand_methods(&methods, &entry.path, &handler));
        }
        Ok(routes)
    }
}
