//! In-memory mock filesystem for testing collectors without real `/proc`.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory. Paths can additionally be marked
/// as unreadable to simulate processes owned by other users.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Paths whose reads fail with `PermissionDenied`.
    denied: HashSet<PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
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

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Makes reads of `path` fail with `PermissionDenied`.
    pub fn deny(&mut self, path: impl AsRef<Path>) {
        self.denied.insert(path.as_ref().to_path_buf());
    }

    /// Adds a process with the `/proc/[pid]/` files the collectors read.
    ///
    /// # Arguments
    /// * `pid` - Process ID
    /// * `stat` - Content of `/proc/[pid]/stat`
    /// * `status` - Content of `/proc/[pid]/status`
    /// * `cmdline` - Content of `/proc/[pid]/cmdline`
    pub fn add_process(&mut self, pid: u32, stat: &str, status: &str, cmdline: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("status"), status);
        self.add_file(base.join("cmdline"), cmdline);
    }

    /// Removes `/proc/[pid]` and everything below it, as if the process exited.
    pub fn remove_process(&mut self, pid: u32) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.files.retain(|path, _| !path.starts_with(&base));
        self.directories.retain(|path| !path.starts_with(&base));
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if self.denied.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", path),
            ));
        }
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if self.denied.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", path),
            ));
        }
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        for file_path in self.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemFree: 16384 kB\n");

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.is_dir(Path::new("/proc")));
        assert!(!fs.is_dir(Path::new("/proc/meminfo")));

        let content = fs.read_to_string(Path::new("/proc/meminfo")).unwrap();
        assert_eq!(content, "MemFree: 16384 kB\n");
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/1/stat", "stat content");
        fs.add_file("/proc/1/status", "status content");
        fs.add_file("/proc/2/stat", "stat content 2");
        fs.add_file("/proc/uptime", "1.0 1.0");

        let proc_entries = fs.read_dir(Path::new("/proc")).unwrap();
        assert_eq!(proc_entries.len(), 3); // /proc/1, /proc/2, /proc/uptime

        let proc1_entries = fs.read_dir(Path::new("/proc/1")).unwrap();
        assert_eq!(proc1_entries.len(), 2);
    }

    #[test]
    fn test_mock_fs_remove_process() {
        let mut fs = MockFs::new();
        fs.add_process(77, "77 (sleep) S", "Name:\tsleep\n", "sleep\x0030\x00");
        assert!(fs.is_dir(Path::new("/proc/77")));

        fs.remove_process(77);
        assert!(!fs.exists(Path::new("/proc/77")));
        assert!(!fs.exists(Path::new("/proc/77/stat")));
        assert!(fs.is_dir(Path::new("/proc")));
    }

    #[test]
    fn test_mock_fs_denied() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/1/status", "Uid:\t0\t0\t0\t0\n");
        fs.deny("/proc/1/status");

        let err = fs.read_to_string(Path::new("/proc/1/status")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
