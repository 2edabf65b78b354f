//! Process enumeration from the `/proc` directory listing.

use std::path::PathBuf;

use tracing::trace;

use super::error::CollectError;
use crate::collector::traits::FileSystem;

/// Returns true if `name` is a non-empty run of ASCII digits.
///
/// Stricter than `str::parse::<u32>`, which would also accept `+1`.
pub fn is_pid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Lists live process ids under a proc root.
pub struct ProcessEnumerator<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
}

impl<F: FileSystem> ProcessEnumerator<F> {
    /// Creates a new enumerator.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    /// Lists the ids of all numeric directories under the proc root.
    ///
    /// Order follows the directory listing and carries no meaning; sort if a
    /// stable order is needed. A listing failure is fatal for the cycle.
    pub fn list_pids(&self) -> Result<Vec<u32>, CollectError> {
        let entries = self.fs.read_dir(&self.proc_path).map_err(|e| {
            CollectError::EnumerationFailed(format!("{}: {}", self.proc_path.display(), e))
        })?;

        let mut pids = Vec::new();
        for entry in entries {
            if let Some(name) = entry.file_name().and_then(|n| n.to_str())
                && is_pid_name(name)
                && self.fs.is_dir(&entry)
                && let Ok(pid) = name.parse::<u32>()
            {
                pids.push(pid);
            }
        }

        trace!(count = pids.len(), "enumerated processes");
        Ok(pids)
    }

    /// Returns true if `pid` still has an entry under the proc root.
    ///
    /// Meant to be called right before a multi-file read of one process.
    pub fn is_pid_existing(&self, pid: u32) -> bool {
        self.fs.is_dir(&self.proc_path.join(pid.to_string()))
    }
}
