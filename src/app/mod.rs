//! Application introspection.
//!
//! This module defines the `RouteSource` trait, the only thing the
//! AppRoutes collector knows about an application. Adapters turn a concrete
//! application description into an ordered route table:
//! - `OpenApiSource`: the `paths` object of an OpenAPI JSON document
//! - `ManifestSource`: a JSON route manifest
//! - `StaticApp`: an application declared in-process with its handlers
//!
//! None of the adapters ever invoke a handler; they read the table only.

mod manifest;
mod openapi;
mod resolver;
mod spec;
mod static_app;

pub use manifest::ManifestSource;
pub use openapi::OpenApiSource;
pub use resolver::{AppRegistry, AppResolver, RouteResolver};
pub use spec::AppSpec;
pub use static_app::{Handler, StaticApp, StaticRoute};

use std::sync::Arc;

use crate::error::ProbeError;

/// One declared endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Upper-case HTTP method.
    pub method: String,
    pub path: String,
    /// Identity of the handler (qualified name or operation id).
    pub handler: String,
}

impl Route {
    pub fn new(method: &str, path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            method: method.trim().to_ascii_uppercase(),
            path: path.into(),
            handler: handler.into(),
        }
    }
}

/// Abstraction for route table enumeration.
///
/// The trait is object-safe and designed to be used with
/// `Box<dyn RouteSource>`.
pub trait RouteSource: Send + Sync {
    /// Short human-readable description of where the routes come from.
    fn describe(&self) -> String;

    /// Returns the declared routes in a deterministic order.
    ///
    /// Must not call any handler or otherwise exercise the request path.
    fn routes(&self) -> Result<Vec<Route>, ProbeError>;
}

impl<T: RouteSource + ?Sized> RouteSource for Arc<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn routes(&self) -> Result<Vec<Route>, ProbeError> {
        (**self).routes()
    }
}

/// Expands a multi-method declaration into one route per method, sorted.
fn expand_methods<S: AsRef<str>>(methods: &[S], path: &str, handler: &str) -> Vec<Route> {
    let mut routes: Vec<Route> = methods
        .iter()
        .map(|m| Route::new(m.as_ref(), path, handler))
        .collect();
    routes.sort_by(|a, b| a.method.cmp(&b.method));
    routes.dedup_by(|a, b| a.method == b.method);
    routes
}
