//! Filesystem seam shared by every `/proc` reader.
//!
//! Readers go through `FileSystem` so the same code runs against the live
//! `/proc` tree or an in-memory [`MockFs`](crate::collector::MockFs).

use std::io;
use std::path::{Path, PathBuf};

/// Read-only filesystem operations needed by the collectors.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// Bytes that are not valid UTF-8 (a Latin-1 argv, an odd `comm`) are
    /// replaced with U+FFFD rather than failing the read. Errors keep
    /// their `io::ErrorKind`, so callers can tell a vanished
    /// process (`NotFound`) from a restricted one (`PermissionDenied`).
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Checks if a path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Lists entries in a directory.
    ///
    /// # Returns
    /// Full paths of the directory's direct children, in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_real_fs_read_to_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uptime");
        fs::write(&path, "350735.47 234388.90\n").unwrap();

        let content = RealFs::new().read_to_string(&path).unwrap();
        assert_eq!(content, "350735.47 234388.90\n");
    }

    #[test]
    fn test_real_fs_read_non_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmdline");
        fs::write(&path, b"/bin/caf\xe9\0arg\0").unwrap();

        let content = RealFs::new().read_to_string(&path).unwrap();
        assert_eq!(content, "/bin/caf\u{FFFD}\0arg\0");
    }

    #[test]
    fn test_real_fs_exists_and_is_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("42")).unwrap();
        fs::write(dir.path().join("stat"), "cpu 1 2 3 4\n").unwrap();

        let fs = RealFs::new();
        assert!(fs.exists(&dir.path().join("42")));
        assert!(fs.is_dir(&dir.path().join("42")));
        assert!(fs.exists(&dir.path().join("stat")));
        assert!(!fs.is_dir(&dir.path().join("stat")));
        assert!(!fs.exists(Path::new("/nonexistent/path/12345")));
    }

    #[test]
    fn test_real_fs_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("1")).unwrap();
        fs::create_dir(dir.path().join("self")).unwrap();

        let mut entries = RealFs::new().read_dir(dir.path()).unwrap();
        entries.sort();
        assert_eq!(entries, vec![dir.path().join("1"), dir.path().join("self")]);
    }

    #[test]
    fn test_real_fs_not_found_kind() {
        let dir = tempfile::tempdir().unwrap();
        let err = RealFs::new()
            .read_to_string(&dir.path().join("missing"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
