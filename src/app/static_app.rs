//! In-process application declared as a route table.

use std::fmt;
use std::sync::Arc;

use super::{Route, RouteSource, expand_methods};
use crate::error::ProbeError;

/// Request handler of a `StaticApp`. Never called by the probe.
pub type Handler = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// One route table entry.
pub struct StaticRoute {
    pub methods: Vec<String>,
    pub path: String,
    /// Qualified handler name reported as the route's handler identity.
    pub handler_name: String,
    pub handler: Handler,
}

impl fmt::Debug for StaticRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticRoute")
            .field("methods", &self.methods)
            .field("path", &self.path)
            .field("handler_name", &self.handler_name)
            .finish_non_exhaustive()
    }
}

/// Application whose routes are registered in code.
#[derive(Debug, Default)]
pub struct StaticApp {
    name: String,
    table: Vec<StaticRoute>,
}

impl StaticApp {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: Vec::new(),
        }
    }

    /// Registers a route.
    pub fn route<H>(mut self, methods: &[&str], path: &str, handler_name: &str, handler: H) -> Self
    where
        H: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.table.push(StaticRoute {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            path: path.to_string(),
            handler_name: handler_name.to_string(),
            handler: Arc::new(handler),
        });
        self
    }

    pub fn table(&self) -> &[StaticRoute] {
        &self.table
    }
}

impl RouteSource for StaticApp {
    fn describe(&self) -> String {
        format!("static app {}", self.name)
    }

    fn routes(&self) -> Result<Vec<Route>, ProbeError> {
        Ok(self
            .table
            .iter()
            .flat_map(|r| expand_methods(&r.methods, &r.path, &r.handler_name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_routes_read_without_calling_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = StaticApp::new("shop").route(&["GET", "HEAD"], "/", "shop.index", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            "ok".to_string()
        });

        let routes = app.routes().unwrap();
        assert_eq!(
            routes,
            vec![
                Route::new("GET", "/", "shop.index"),
                Route::new("HEAD", "/", "shop.index"),
            ]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // the handler itself still works when the application serves requests
        assert_eq!((app.table()[0].handler)("/"), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
