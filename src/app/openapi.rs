//! OpenAPI document adapter.

use serde_json::Value;

use super::{Route, RouteSource};
use crate::error::ProbeError;

/// Operation keys of an OpenAPI path item.
const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Routes declared in the `paths` object of an OpenAPI JSON document.
#[derive(Debug, Clone)]
pub struct OpenApiSource {
    origin: String,
    document: Value,
}

impl OpenApiSource {
    /// Parses a document. `origin` is only used for descriptions.
    pub fn from_json(origin: impl Into<String>, content: &str) -> Result<Self, ProbeError> {
        let origin = origin.into();
        let document: Value = serde_json::from_str(content).map_err(|e| {
            ProbeError::ResolutionError(format!("{}: invalid OpenAPI JSON: {}", origin, e))
        })?;
        if !document.get("paths").is_some_and(Value::is_object) {
            return Err(ProbeError::ResolutionError(format!(
                "{}: OpenAPI document has no paths object",
                origin
            )));
        }
        Ok(Self { origin, document })
    }
}

impl RouteSource for OpenApiSource {
    fn describe(&self) -> String {
        let title = self
            .document
            .pointer("/info/title")
            .and_then(Value::as_str)
            .unwrap_or("untitled");
        format!("openapi {} ({})", title, self.origin)
    }

    fn routes(&self) -> Result<Vec<Route>, ProbeError> {
        let Some(paths) = self.document.get("paths").and_then(Value::as_object) else {
            return Ok(Vec::new());
        };

        let mut routes = Vec::new();
        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            let mut methods: Vec<&str> = HTTP_METHODS
                .iter()
                .copied()
                .filter(|m| item.contains_key(*m))
                .collect();
            methods.sort_unstable();

            for method in methods {
                let upper = method.to_ascii_uppercase();
                let handler = item
                    .get(method)
                    .and_then(|op| op.get("operationId"))
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| format!("{} {}", upper, path));
                routes.push(Route::new(&upper, path.as_str(), handler));
            }
        }
        routes.sort_by(|a, b| (&a.path, &a.method).cmp(&(&b.path, &b.method)));
        Ok(routes)
    }
}
