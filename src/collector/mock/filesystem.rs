//! In-memory mock filesystem for testing collectors without a real host.
//!
//! `MockFs` simulates files, directories, symlinks and unreadable paths,
//! allowing collector tests to run on macOS and in CI without Linux.

use crate::collector::traits::{EntryKind, FileMeta, FileSystem};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// Default modification time for mock entries (2023-11-14T22:13:20Z).
const MOCK_MTIME: i64 = 1_700_000_000;

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, Vec<u8>>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Symlinks (path -> target). Listed but never followed.
    symlinks: HashMap<PathBuf, PathBuf>,
    /// Per-path permission bits overriding the defaults.
    modes: HashMap<PathBuf, u32>,
    /// Paths whose reads fail with `PermissionDenied`.
    denied: HashSet<PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.add_bytes(path, content.into().into_bytes());
    }

    /// Adds a file with raw byte content.
    pub fn add_bytes(&mut self, path: impl AsRef<Path>, content: Vec<u8>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content);
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds a symlink pointing at `target`.
    pub fn add_symlink(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.symlinks.insert(path, target.as_ref().to_path_buf());
    }

    /// Overrides the permission bits reported for `path`.
    pub fn set_mode(&mut self, path: impl AsRef<Path>, mode: u32) {
        self.modes.insert(path.as_ref().to_path_buf(), mode);
    }

    /// Makes every read of `path` (file or directory) fail with `PermissionDenied`.
    pub fn deny(&mut self, path: impl AsRef<Path>) {
        self.denied.insert(path.as_ref().to_path_buf());
    }

    /// Adds a process with its `/proc/[pid]/` files.
    ///
    /// # Arguments
    /// * `pid` - Process ID
    /// * `stat` - Content of `/proc/[pid]/stat`
    /// * `status` - Content of `/proc/[pid]/status`
    /// * `cmdline` - Content of `/proc/[pid]/cmdline`
    /// * `comm` - Content of `/proc/[pid]/comm`
    pub fn add_process(&mut self, pid: u32, stat: &str, status: &str, cmdline: &str, comm: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("status"), status);
        self.add_file(base.join("cmdline"), cmdline);
        self.add_file(base.join("comm"), comm);
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    fn check_access(&self, path: &Path) -> io::Result<()> {
        if self.denied.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", path),
            ));
        }
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.check_access(path)?;
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("not found: {:?}", path))
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn read_head(&self, path: &Path, limit: u64) -> io::Result<Vec<u8>> {
        let mut bytes = self.read(path)?;
        bytes.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
            || self.directories.contains(path)
            || self.symlinks.contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.check_access(path)?;
        if !self.directories.contains(path) {
            return Err(Self::not_found(path));
        }

        let is_child = |p: &PathBuf| p.parent().is_some_and(|parent| parent == path) && p != path;

        let mut entries = HashSet::new();
        entries.extend(self.files.keys().filter(|p| is_child(p)).cloned());
        entries.extend(self.directories.iter().filter(|p| is_child(p)).cloned());
        entries.extend(self.symlinks.keys().filter(|p| is_child(p)).cloned());

        Ok(entries.into_iter().collect())
    }

    fn metadata(&self, path: &Path) -> io::Result<FileMeta> {
        let (kind, size, default_mode) = if let Some(content) = self.files.get(path) {
            (EntryKind::File, content.len() as u64, 0o644)
        } else if self.directories.contains(path) {
            (EntryKind::Dir, 4096, 0o755)
        } else if let Some(target) = self.symlinks.get(path) {
            (EntryKind::Symlink, target.as_os_str().len() as u64, 0o777)
        } else {
            return Err(Self::not_found(path));
        };

        Ok(FileMeta {
            kind,
            size,
            mode: self.modes.get(path).copied().unwrap_or(default_mode),
            modified: Some(MOCK_MTIME),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 16384 kB\n");

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.exists(Path::new("/proc")));

        let content = fs.read_to_string(Path::new("/proc/meminfo")).unwrap();
        assert_eq!(content, "MemTotal: 16384 kB\n");
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/1/stat", "stat content");
        fs.add_file("/proc/1/status", "status content");
        fs.add_file("/proc/2/stat", "stat content 2");
        fs.add_symlink("/proc/self", "/proc/1");

        let proc_entries = fs.read_dir(Path::new("/proc")).unwrap();
        assert_eq!(proc_entries.len(), 3); // /proc/1, /proc/2, /proc/self

        let proc1_entries = fs.read_dir(Path::new("/proc/1")).unwrap();
        assert_eq!(proc1_entries.len(), 2);
    }

    #[test]
    fn test_mock_fs_metadata() {
        let mut fs = MockFs::new();
        fs.add_file("/srv/app/run.sh", "#!/bin/sh\n");
        fs.set_mode("/srv/app/run.sh", 0o755);
        fs.add_symlink("/srv/current", "/srv/app");

        let meta = fs.metadata(Path::new("/srv/app/run.sh")).unwrap();
        assert_eq!(meta.kind, EntryKind::File);
        assert_eq!(meta.size, 10);
        assert_eq!(meta.mode, 0o755);

        let link = fs.metadata(Path::new("/srv/current")).unwrap();
        assert_eq!(link.kind, EntryKind::Symlink);

        let dir = fs.metadata(Path::new("/srv")).unwrap();
        assert_eq!(dir.kind, EntryKind::Dir);
    }

    #[test]
    fn test_mock_fs_denied() {
        let mut fs = MockFs::new();
        fs.add_file("/root/.ssh/id_rsa", "secret");
        fs.deny("/root/.ssh");

        let err = fs.read_dir(Path::new("/root/.ssh")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(fs.read_dir(Path::new("/root")).is_ok());
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
