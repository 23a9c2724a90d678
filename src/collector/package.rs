//! Package collector: installed packages and dependency manifests under the
//! probe root.
//!
//! Supported sources, relative to root:
//! - `var/lib/dpkg/status` (dpkg, installed entries only)
//! - `lib/apk/db/installed` (apk)
//! - `Cargo.lock` (cargo)
//! - `requirements.txt` (pip)

use std::io;
use std::path::Path;

use tracing::debug;

use crate::collector::FactCollector;
use crate::collector::procfs::parser::ParseError;
use crate::collector::traits::FileSystem;
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::storage::model::{CollectorKind, FactValue, Facts, Outcome};

/// One installed package or pinned dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageEntry {
    pub name: String,
    /// Exact version, or the raw requirement when nothing is pinned.
    pub version: Option<String>,
}

impl PackageEntry {
    fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

type ManifestParser = fn(&str) -> Result<Vec<PackageEntry>, ParseError>;

/// Known manifests: relative path, manager name, parser.
const MANIFESTS: [(&str, &str, ManifestParser); 4] = [
    ("var/lib/dpkg/status", "dpkg", parse_dpkg_status),
    ("lib/apk/db/installed", "apk", parse_apk_installed),
    ("Cargo.lock", "cargo", parse_cargo_lock),
    ("requirements.txt", "pip", parse_requirements),
];

/// Splits a `Key: value` database into blank-line separated stanzas.
fn stanzas(content: &str) -> impl Iterator<Item = Vec<(&str, &str)>> {
    content.split("\n\n").filter_map(|block| {
        let fields: Vec<(&str, &str)> = block
            .lines()
            .filter(|l| !l.starts_with(' '))
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();
        (!fields.is_empty()).then_some(fields)
    })
}

fn field<'a>(fields: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    fields.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Parses `/var/lib/dpkg/status`, keeping `install ok installed` entries.
pub fn parse_dpkg_status(content: &str) -> Result<Vec<PackageEntry>, ParseError> {
    let mut stanza_count = 0;
    let packages: Vec<PackageEntry> = stanzas(content)
        .inspect(|_| stanza_count += 1)
        .filter(|f| field(f, "Status") == Some("install ok installed"))
        .filter_map(|f| {
            let name = field(&f, "Package")?;
            Some(PackageEntry::new(name, field(&f, "Version").map(String::from)))
        })
        .collect();

    if stanza_count == 0 {
        return Err(ParseError::new("dpkg status has no entries"));
    }
    Ok(packages)
}

/// Parses the apk installed database (`P:` name, `V:` version).
pub fn parse_apk_installed(content: &str) -> Result<Vec<PackageEntry>, ParseError> {
    let packages: Vec<PackageEntry> = stanzas(content)
        .filter_map(|f| {
            let name = field(&f, "P")?;
            Some(PackageEntry::new(name, field(&f, "V").map(String::from)))
        })
        .collect();

    if packages.is_empty() {
        return Err(ParseError::new("apk database has no packages"));
    }
    Ok(packages)
}

/// Parses the `[[package]]` tables of a `Cargo.lock`.
pub fn parse_cargo_lock(content: &str) -> Result<Vec<PackageEntry>, ParseError> {
    fn quoted(value: &str) -> Option<String> {
        Some(value.trim().strip_prefix('"')?.strip_suffix('"')?.to_string())
    }

    let mut packages = Vec::new();
    let mut current: Option<(Option<String>, Option<String>)> = None;

    for line in content.lines().map(str::trim) {
        if line.starts_with('[') {
            if let Some((Some(name), version)) = current.take() {
                packages.push(PackageEntry::new(name, version));
            }
            if line == "[[package]]" {
                current = Some((None, None));
            }
            continue;
        }

        let Some((name, version)) = current.as_mut() else {
            continue;
        };
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "name" => *name = quoted(value),
                "version" => *version = quoted(value),
                _ => {}
            }
        }
    }
    if let Some((Some(name), version)) = current {
        packages.push(PackageEntry::new(name, version));
    }

    if packages.is_empty() {
        return Err(ParseError::new("Cargo.lock has no [[package]] entries"));
    }
    Ok(packages)
}

/// Parses a pip `requirements.txt`.
///
/// `name==version` pins yield the version; any other specifier is kept
/// verbatim. Options (`-r`, `--index-url`) and comments are skipped.
pub fn parse_requirements(content: &str) -> Result<Vec<PackageEntry>, ParseError> {
    let mut packages = Vec::new();

    for line in content.lines() {
        let line = line.split(" #").next().unwrap_or("").trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        let line = line.split(';').next().unwrap_or("").trim();

        let name_end = line
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(line.len());
        let name = &line[..name_end];
        if name.is_empty() {
            return Err(ParseError::new(format!("invalid requirement: {}", line)));
        }

        let mut rest = &line[name_end..];
        if rest.starts_with('[') {
            rest = rest.find(']').map(|i| &rest[i + 1..]).unwrap_or("");
        }
        let rest = rest.trim();

        let version = match rest.strip_prefix("==") {
            Some(pinned) => Some(pinned.trim().to_string()),
            None if rest.is_empty() => None,
            None => Some(rest.to_string()),
        };
        packages.push(PackageEntry::new(name, version));
    }

    Ok(packages)
}

/// Reports package managers and manifests found under the probe root.
pub struct PackageCollector<F: FileSystem> {
    fs: F,
}

impl<F: FileSystem> PackageCollector<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Reads and parses one manifest. `Ok(None)` when it does not exist.
    fn read_manifest(
        &self,
        path: &Path,
        parse: ManifestParser,
    ) -> Result<Option<Vec<PackageEntry>>, ProbeError> {
        let content = match self.fs.read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ProbeError::from_io(path.display(), e)),
        };
        parse(&content)
            .map(Some)
            .map_err(|e| ProbeError::Parse(format!("{}: {}", path.display(), e.message)))
    }
}

impl<F: FileSystem> FactCollector for PackageCollector<F> {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Package
    }

    fn collect(&self, config: &ProbeConfig) -> Outcome {
        let mut sources = Vec::new();
        let mut errors = Vec::new();
        let mut total = 0;

        for (relative, manager, parse) in MANIFESTS {
            let path = config.root.join(relative);
            let packages = match self.read_manifest(&path, parse) {
                Ok(Some(packages)) => packages,
                Ok(None) => continue,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            debug!(manifest = %path.display(), count = packages.len(), "manifest parsed");
            total += packages.len();

            let list: Vec<FactValue> = packages
                .into_iter()
                .map(|p| {
                    FactValue::map([
                        ("name", FactValue::from(p.name)),
                        ("version", FactValue::from(p.version)),
                    ])
                })
                .collect();
            sources.push(FactValue::map([
                ("source", FactValue::from(path.to_string_lossy().into_owned())),
                ("manager", FactValue::from(manager)),
                ("count", FactValue::from(list.len())),
                ("packages", FactValue::List(list)),
            ]));
        }

        if sources.is_empty() && errors.is_empty() {
            errors.push(ProbeError::NotFound(format!(
                "no package manifest under {}",
                config.root.display()
            )));
        }

        let mut facts = Facts::new();
        if !sources.is_empty() {
            facts.insert("package_count".to_string(), total.into());
            facts.insert("sources".to_string(), FactValue::List(sources));
        }

        Outcome::from_parts(CollectorKind::Package, facts, errors)
    }
}
