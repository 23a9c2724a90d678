//! Filesystem collector: bounded walk of the probe root plus the mount
//! points touching it.
//!
//! Kernel pseudo filesystems (procfs, sysfs, devices, cgroups) are listed
//! but never descended into or hashed: their files report size 0 and some
//! of them block or consume data on read.

use std::path::{Path, PathBuf};

use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::collector::FactCollector;
use crate::collector::procfs::parser::{MountEntry, parse_mountinfo};
use crate::collector::traits::{EntryKind, FileSystem};
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::storage::model::{CollectorKind, FactValue, Facts, Outcome};
use crate::util::epoch_to_iso;

/// Filesystem types whose contents are synthesized by the kernel.
const PSEUDO_FSTYPES: &[&str] = &[
    "proc",
    "sysfs",
    "devtmpfs",
    "devpts",
    "debugfs",
    "tracefs",
    "securityfs",
    "pstore",
    "bpf",
    "configfs",
    "fusectl",
    "mqueue",
    "binfmt_misc",
    "efivarfs",
    "autofs",
];

fn is_pseudo_fstype(fstype: &str) -> bool {
    fstype.starts_with("cgroup") || PSEUDO_FSTYPES.contains(&fstype)
}

/// Lists entries under `root` without following symlinks.
pub struct FilesystemCollector<F: FileSystem> {
    fs: F,
}

/// State of one walk.
struct Walk<'a, F: FileSystem> {
    fs: &'a F,
    root: &'a Path,
    max_depth: usize,
    max_entries: usize,
    hash_limit: u64,
    /// Mount points of pseudo filesystems; nothing below them is read.
    pseudo_mounts: Vec<PathBuf>,
    entries: Vec<FactValue>,
    truncated: bool,
    unreadable: usize,
    first_error: Option<ProbeError>,
}

impl<F: FileSystem> Walk<'_, F> {
    fn on_pseudo_fs(&self, path: &Path) -> bool {
        self.pseudo_mounts.iter().any(|m| path.starts_with(m))
    }

    fn record_error(&mut self, err: ProbeError) {
        self.unreadable += 1;
        if self.first_error.is_none() {
            self.first_error = Some(err);
        }
    }

    /// Visits the sorted children of `dir`, which sits at `depth` below root.
    fn visit(&mut self, dir: &Path, depth: usize) -> Result<(), ProbeError> {
        let mut children = self
            .fs
            .read_dir(dir)
            .map_err(|e| ProbeError::from_io(dir.display(), e))?;
        children.sort();

        for child in children {
            if self.entries.len() >= self.max_entries {
                self.truncated = true;
                return Ok(());
            }

            let meta = match self.fs.metadata(&child) {
                Ok(meta) => meta,
                Err(e) => {
                    self.record_error(ProbeError::from_io(child.display(), e));
                    continue;
                }
            };

            let relative = child
                .strip_prefix(self.root)
                .unwrap_or(&child)
                .to_string_lossy()
                .into_owned();

            let mut entry = Facts::new();
            entry.insert("path".to_string(), relative.into());
            entry.insert("kind".to_string(), meta.kind.as_str().into());
            entry.insert("size".to_string(), meta.size.into());
            entry.insert("mode".to_string(), format!("{:04o}", meta.mode).into());
            entry.insert(
                "modified".to_string(),
                meta.modified.and_then(epoch_to_iso).into(),
            );

            let pseudo = self.on_pseudo_fs(&child);

            if meta.kind == EntryKind::File
                && !pseudo
                && meta.size > 0
                && meta.size <= self.hash_limit
            {
                match self.fs.read_head(&child, self.hash_limit) {
                    Ok(bytes) => {
                        entry.insert(
                            "xxh3".to_string(),
                            format!("{:016x}", xxh3_64(&bytes)).into(),
                        );
                    }
                    Err(e) => self.record_error(ProbeError::from_io(child.display(), e)),
                }
            }

            self.entries.push(FactValue::Map(entry));

            if meta.kind == EntryKind::Dir && !pseudo && depth + 1 < self.max_depth {
                if let Err(e) = self.visit(&child, depth + 1) {
                    self.record_error(e);
                }
                if self.truncated {
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

impl<F: FileSystem> FilesystemCollector<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    fn mount_table(&self, config: &ProbeConfig) -> Result<Vec<MountEntry>, ProbeError> {
        let path = config.proc_path.join("self/mountinfo");
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|e| ProbeError::from_io(path.display(), e))?;
        Ok(parse_mountinfo(&content))
    }
}

/// Pseudo filesystem mount points, always including the configured proc path.
fn pseudo_mounts(table: &[MountEntry], config: &ProbeConfig) -> Vec<PathBuf> {
    let mut mounts: Vec<PathBuf> = table
        .iter()
        .filter(|m| is_pseudo_fstype(&m.fstype))
        .map(|m| PathBuf::from(&m.mount_point))
        .collect();
    if !mounts.contains(&config.proc_path) {
        mounts.push(config.proc_path.clone());
    }
    mounts
}

/// Mounts at, above or below `root`.
fn mounts_touching(table: Vec<MountEntry>, root: &Path) -> Vec<FactValue> {
    table
        .into_iter()
        .filter(|m| {
            let mount_point = Path::new(&m.mount_point);
            mount_point.starts_with(root) || root.starts_with(mount_point)
        })
        .map(|m| {
            FactValue::map([
                ("mount_point", m.mount_point),
                ("fstype", m.fstype),
                ("source", m.source),
                ("options", m.options),
            ])
        })
        .collect()
}

impl<F: FileSystem> FactCollector for FilesystemCollector<F> {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Filesystem
    }

    fn collect(&self, config: &ProbeConfig) -> Outcome {
        let table = self.mount_table(config);
        let pseudo = match &table {
            Ok(table) => pseudo_mounts(table, config),
            Err(_) => pseudo_mounts(&[], config),
        };

        let mut walk = Walk {
            fs: &self.fs,
            root: &config.root,
            max_depth: config.max_depth,
            max_entries: config.max_entries,
            hash_limit: config.hash_limit_bytes,
            pseudo_mounts: pseudo,
            entries: Vec::new(),
            truncated: false,
            unreadable: 0,
            first_error: None,
        };

        if config.max_depth > 0 {
            if let Err(e) = walk.visit(&config.root, 0) {
                return Outcome::from_parts(CollectorKind::Filesystem, Facts::new(), vec![e]);
            }
        }
        debug!(
            root = %config.root.display(),
            entries = walk.entries.len(),
            unreadable = walk.unreadable,
            truncated = walk.truncated,
            "filesystem walk finished"
        );

        let mut facts = Facts::new();
        let mut errors = Vec::new();

        facts.insert(
            "root".to_string(),
            config.root.to_string_lossy().into_owned().into(),
        );
        facts.insert("entry_count".to_string(), walk.entries.len().into());
        facts.insert("truncated".to_string(), walk.truncated.into());
        facts.insert("entries".to_string(), FactValue::List(walk.entries));

        if let Some(first) = walk.first_error {
            facts.insert("unreadable_count".to_string(), walk.unreadable.into());
            errors.push(ProbeError::AccessDenied(format!(
                "{} entries unreadable, first: {}",
                walk.unreadable, first
            )));
        }

        match table {
            Ok(table) => {
                facts.insert(
                    "mounts".to_string(),
                    FactValue::List(mounts_touching(table, &config.root)),
                );
            }
            Err(e) => errors.push(e),
        }

        Outcome::from_parts(CollectorKind::Filesystem, facts, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::traits::RealFs;
    use crate::storage::model::OutcomeStatus;

    fn config() -> ProbeConfig {
        ProbeConfig::new("/srv/app").with_commands(false)
    }

    fn paths(outcome: &Outcome) -> Vec<String> {
        outcome
            .fact("entries")
            .and_then(FactValue::as_list)
            .unwrap()
            .iter()
            .map(|e| e.get("path").and_then(FactValue::as_str).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_walk_sorted_depth_first() {
        let outcome = FilesystemCollector::new(MockFs::typical_host()).collect(&config());
        assert_eq!(outcome.status, OutcomeStatus::Ok, "{:?}", outcome.error);
        assert_eq!(
            paths(&outcome),
            vec![
                "Cargo.lock",
                "README.md",
                "bin",
                "bin/run.sh",
                "data store",
                "requirements.txt"
            ]
        );
        assert_eq!(outcome.fact("truncated"), Some(&FactValue::Bool(false)));

        let entries = outcome.fact("entries").and_then(FactValue::as_list).unwrap();
        let script = &entries[3];
        assert_eq!(script.get("mode").and_then(FactValue::as_str), Some("0755"));
        assert_eq!(script.get("kind").and_then(FactValue::as_str), Some("file"));
        assert_eq!(
            script.get("modified").and_then(FactValue::as_str),
            Some("2023-11-14T22:13:20Z")
        );
        let expected = format!("{:016x}", xxh3_64(b"#!/bin/sh\nexec ./server\n"));
        assert_eq!(
            script.get("xxh3").and_then(FactValue::as_str),
            Some(expected.as_str())
        );
        assert!(entries[2].get("xxh3").is_none());
    }

    #[test]
    fn test_mounts_touching_root() {
        let outcome = FilesystemCollector::new(MockFs::typical_host()).collect(&config());
        let mounts: Vec<&str> = outcome
            .fact("mounts")
            .and_then(FactValue::as_list)
            .unwrap()
            .iter()
            .filter_map(|m| m.get("mount_point").and_then(FactValue::as_str))
            .collect();
        assert_eq!(mounts, vec!["/", "/srv", "/srv/app/data store"]);
    }

    #[test]
    fn test_entry_limit_truncates() {
        let outcome = FilesystemCollector::new(MockFs::typical_host())
            .collect(&config().with_walk_limits(4, 2));
        assert_eq!(paths(&outcome), vec!["Cargo.lock", "README.md"]);
        assert_eq!(outcome.fact("truncated"), Some(&FactValue::Bool(true)));
    }

    #[test]
    fn test_depth_limit() {
        let outcome = FilesystemCollector::new(MockFs::typical_host())
            .collect(&config().with_walk_limits(1, 100));
        assert!(!paths(&outcome).contains(&"bin/run.sh".to_string()));
        assert!(paths(&outcome).contains(&"bin".to_string()));
    }

    #[test]
    fn test_symlink_not_followed() {
        let mut fs = MockFs::typical_host();
        fs.add_symlink("/srv/app/etc-link", "/etc");
        let outcome = FilesystemCollector::new(fs).collect(&config());

        let entries = outcome.fact("entries").and_then(FactValue::as_list).unwrap();
        let link = entries
            .iter()
            .find(|e| e.get("path").and_then(FactValue::as_str) == Some("etc-link"))
            .unwrap();
        assert_eq!(link.get("kind").and_then(FactValue::as_str), Some("symlink"));
        assert!(!paths(&outcome).iter().any(|p| p.contains("passwd")));
    }

    #[test]
    fn test_unreadable_subdir_is_partial() {
        let mut fs = MockFs::typical_host();
        fs.deny("/srv/app/bin");
        let outcome = FilesystemCollector::new(fs).collect(&config());

        assert_eq!(outcome.status, OutcomeStatus::PartialFailure);
        assert_eq!(
            outcome.fact("unreadable_count").and_then(FactValue::as_u64),
            Some(1)
        );
        assert!(outcome.error.as_deref().unwrap().contains("/srv/app/bin"));
    }

    #[test]
    fn test_unreachable_root_is_failed() {
        let outcome = FilesystemCollector::new(MockFs::typical_host())
            .collect(&ProbeConfig::new("/does/not/exist"));
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.error.as_deref().unwrap().starts_with("NotFound"));
    }

    #[test]
    fn test_pseudo_filesystems_listed_not_read() {
        let mut fs = MockFs::typical_host();
        fs.add_file("/proc/kmsg", "<6>kernel ring buffer\n");
        let config = ProbeConfig::new("/").with_walk_limits(3, 10_000);
        let outcome = FilesystemCollector::new(fs).collect(&config);

        assert_eq!(outcome.status, OutcomeStatus::Ok, "{:?}", outcome.error);
        let paths = paths(&outcome);
        assert!(paths.contains(&"proc".to_string()));
        assert!(paths.contains(&"srv/app".to_string()));
        assert!(!paths.iter().any(|p| p.starts_with("proc/")));
    }

    #[test]
    fn test_root_on_pseudo_filesystem_is_not_hashed() {
        let mut fs = MockFs::typical_host();
        fs.add_file("/proc/kmsg", "<6>kernel ring buffer\n");
        let outcome = FilesystemCollector::new(fs).collect(&ProbeConfig::new("/proc"));

        let entries = outcome.fact("entries").and_then(FactValue::as_list).unwrap();
        let kmsg = entries
            .iter()
            .find(|e| e.get("path").and_then(FactValue::as_str) == Some("kmsg"))
            .unwrap();
        assert!(kmsg.get("xxh3").is_none());
        assert!(!paths(&outcome).iter().any(|p| p.contains('/')));
    }

    #[test]
    fn test_proc_path_skipped_without_mountinfo() {
        let mut fs = MockFs::typical_host();
        fs.deny("/proc/self/mountinfo");
        let config = ProbeConfig::new("/").with_walk_limits(3, 10_000);
        let outcome = FilesystemCollector::new(fs).collect(&config);

        assert_eq!(outcome.status, OutcomeStatus::PartialFailure);
        assert!(outcome.fact("mounts").is_none());
        assert!(!paths(&outcome).iter().any(|p| p.starts_with("proc/")));
    }

    #[test]
    fn test_empty_file_not_hashed() {
        let mut fs = MockFs::typical_host();
        fs.add_file("/srv/app/.keep", "");
        let outcome = FilesystemCollector::new(fs).collect(&config());

        let entries = outcome.fact("entries").and_then(FactValue::as_list).unwrap();
        let keep = entries
            .iter()
            .find(|e| e.get("path").and_then(FactValue::as_str) == Some(".keep"))
            .unwrap();
        assert_eq!(keep.get("size").and_then(FactValue::as_u64), Some(0));
        assert!(keep.get("xxh3").is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_real_proc_walk_finishes() {
        use std::sync::mpsc;
        use std::time::Duration;

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let config = ProbeConfig::new("/proc").with_walk_limits(2, 100_000);
            let _ = tx.send(FilesystemCollector::new(RealFs::new()).collect(&config));
        });
        let outcome = rx.recv_timeout(Duration::from_secs(10)).unwrap();

        let entries = outcome.fact("entries").and_then(FactValue::as_list).unwrap();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.get("xxh3").is_none()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_relative_root_sees_mounts() {
        let config = ProbeConfig::new(".").with_walk_limits(1, 10);
        let outcome = FilesystemCollector::new(RealFs::new()).collect(&config);

        let root = outcome.fact("root").and_then(FactValue::as_str).unwrap();
        assert!(Path::new(root).is_absolute());
        let mounts = outcome.fact("mounts").and_then(FactValue::as_list).unwrap();
        assert!(!mounts.is_empty());
    }

    #[test]
    fn test_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), "world").unwrap();

        let config = ProbeConfig::new(dir.path()).with_commands(false);
        let outcome = FilesystemCollector::new(RealFs::new()).collect(&config);

        assert_eq!(paths(&outcome), vec!["a.txt", "sub", "sub/b.txt"]);
        assert_eq!(outcome.fact("entry_count").and_then(FactValue::as_u64), Some(3));
    }
}
