//! AppRoutes collector: the declared route table of an application.

use std::sync::Arc;

use tracing::debug;

use crate::app::{AppSpec, Route, RouteResolver};
use crate::collector::FactCollector;
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::storage::model::{CollectorKind, FactValue, Facts, Outcome};

/// Enumerates the routes of the application named by `ProbeConfig::app_spec`.
pub struct AppRoutesCollector {
    resolver: Arc<dyn RouteResolver>,
}

impl AppRoutesCollector {
    pub fn new(resolver: Arc<dyn RouteResolver>) -> Self {
        Self { resolver }
    }

    fn routes(&self, config: &ProbeConfig) -> Result<(AppSpec, String, Vec<Route>), ProbeError> {
        let raw = config.app_spec.as_deref().ok_or_else(|| {
            ProbeError::ResolutionError("no application spec configured".to_string())
        })?;
        let spec = AppSpec::parse(raw)?;
        let source = self.resolver.resolve(&spec, &config.root)?;
        let routes = source.routes()?;
        Ok((spec, source.describe(), routes))
    }
}

impl FactCollector for AppRoutesCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::AppRoutes
    }

    fn collect(&self, config: &ProbeConfig) -> Outcome {
        let (spec, source, routes) = match self.routes(config) {
            Ok(resolved) => resolved,
            Err(e) => return Outcome::from_parts(CollectorKind::AppRoutes, Facts::new(), vec![e]),
        };
        debug!(source = %source, count = routes.len(), "routes enumerated");

        let list: Vec<FactValue> = routes
            .into_iter()
            .map(|r| {
                FactValue::map([
                    ("method", r.method),
                    ("path", r.path),
                    ("handler", r.handler),
                ])
            })
            .collect();

        let mut facts = Facts::new();
        facts.insert("spec".to_string(), spec.to_string().into());
        facts.insert("source".to_string(), source.into());
        facts.insert("count".to_string(), list.len().into());
        facts.insert("routes".to_string(), FactValue::List(list));
        Outcome::ok(CollectorKind::AppRoutes, facts)
    }
}
