//! Line/token access to `/proc`-style record files.
//!
//! Pseudo-files are small and change under our feet, so each one is read in
//! a single call and then scanned from memory. That keeps every metric
//! derived from one file consistent with itself.

use std::path::{Path, PathBuf};

use super::error::CollectError;
use crate::collector::traits::FileSystem;

/// Splits a line on runs of whitespace.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// The contents of one record file, read in a single call.
#[derive(Debug, Clone)]
pub struct Records {
    path: PathBuf,
    content: String,
}

impl Records {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Path the records were read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Lines of the file, without terminators.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.lines()
    }

    /// Whitespace-tokenized lines, skipping blank ones.
    pub fn records(&self) -> impl Iterator<Item = Vec<&str>> {
        self.lines().map(tokenize).filter(|r| !r.is_empty())
    }

    /// First line, or `None` for an empty file.
    pub fn first_line(&self) -> Option<&str> {
        self.lines().next()
    }

    /// Tokens of the first line that starts with `prefix`.
    pub fn find_prefixed(&self, prefix: &str) -> Option<Vec<&str>> {
        self.lines()
            .find(|line| line.starts_with(prefix))
            .map(tokenize)
    }

    /// Tokens of the first line whose first token is exactly `key`.
    pub fn find_keyed(&self, key: &str) -> Option<Vec<&str>> {
        self.records().find(|r| r[0] == key)
    }
}

/// Opens record files through a [`FileSystem`].
pub struct RecordReader<F: FileSystem> {
    fs: F,
}

impl<F: FileSystem> RecordReader<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Reads `path` in one go.
    ///
    /// Fails with [`CollectError::NotFound`] when the path is gone and
    /// [`CollectError::PermissionDenied`] when it is not readable.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Records, CollectError> {
        let path = path.as_ref();
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| CollectError::from_io(path, e))?;
        Ok(Records::new(path, content))
    }
}
