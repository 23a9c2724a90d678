//! Application spec grammar.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ProbeError;

/// Parsed application reference.
///
/// ```text
/// openapi:<path>     OpenAPI JSON document
/// routes:<path>      JSON route manifest
/// <module>:<attr>    entry registered in the in-process AppRegistry
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSpec {
    OpenApi(PathBuf),
    Manifest(PathBuf),
    Entry { module: String, attr: String },
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

impl AppSpec {
    /// Parses a spec string. Anything not matching the grammar is a
    /// `ResolutionError`.
    pub fn parse(spec: &str) -> Result<Self, ProbeError> {
        let spec = spec.trim();
        let malformed =
            || ProbeError::ResolutionError(format!("malformed application spec '{}'", spec));

        let (prefix, rest) = spec.split_once(':').ok_or_else(malformed)?;
        let rest = rest.trim();

        match prefix.trim() {
            "openapi" if !rest.is_empty() => Ok(AppSpec::OpenApi(PathBuf::from(rest))),
            "routes" if !rest.is_empty() => Ok(AppSpec::Manifest(PathBuf::from(rest))),
            "openapi" | "routes" => Err(malformed()),
            module if module.split('.').all(is_identifier) && is_identifier(rest) => {
                Ok(AppSpec::Entry {
                    module: module.to_string(),
                    attr: rest.to_string(),
                })
            }
            _ => Err(malformed()),
        }
    }

    /// Document path resolved against `root`; `None` for entry references.
    pub fn document_path(&self, root: &Path) -> Option<PathBuf> {
        match self {
            AppSpec::OpenApi(path) | AppSpec::Manifest(path) => Some(root.join(path)),
            AppSpec::Entry { .. } => None,
        }
    }
}

impl fmt::Display for AppSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppSpec::OpenApi(path) => write!(f, "openapi:{}", path.display()),
            AppSpec::Manifest(path) => write!(f, "routes:{}", path.display()),
            AppSpec::Entry { module, attr } => write!(f, "{}:{}", module, attr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!(
            AppSpec::parse("openapi:docs/openapi.json").unwrap(),
            AppSpec::OpenApi(PathBuf::from("docs/openapi.json"))
        );
        assert_eq!(
            AppSpec::parse("routes:/etc/app/routes.json").unwrap(),
            AppSpec::Manifest(PathBuf::from("/etc/app/routes.json"))
        );
        assert_eq!(
            AppSpec::parse("shop.api:app").unwrap(),
            AppSpec::Entry {
                module: "shop.api".to_string(),
                attr: "app".to_string()
            }
        );
    }

    #[test]
    fn test_parse_malformed() {
        for spec in ["", "app", "openapi:", "shop..api:app", "shop.api:", "1shop:app", "a:b:c"] {
            let err = AppSpec::parse(spec).unwrap_err();
            assert_eq!(err.label(), "ResolutionError", "spec {:?}", spec);
        }
    }

    #[test]
    fn test_document_path_relative_to_root() {
        let root = Path::new("/srv/app");
        let spec = AppSpec::parse("openapi:openapi.json").unwrap();
        assert_eq!(
            spec.document_path(root),
            Some(PathBuf::from("/srv/app/openapi.json"))
        );

        let absolute = AppSpec::parse("routes:/opt/routes.json").unwrap();
        assert_eq!(
            absolute.document_path(root),
            Some(PathBuf::from("/opt/routes.json"))
        );
        assert_eq!(AppSpec::parse("shop:app").unwrap().document_path(root), None);
    }
}
