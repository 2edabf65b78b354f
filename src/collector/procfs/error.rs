//! Error type shared by the `/proc` readers.

use std::fmt;
use std::io;
use std::path::PathBuf;

use super::parser::ParseError;

/// Error type for collection failures.
///
/// Everything except [`CollectError::EnumerationFailed`] is scoped to a
/// single process or a single system metric and must not abort a poll cycle.
#[derive(Debug)]
pub enum CollectError {
    /// The path vanished, typically because the process exited.
    NotFound(PathBuf),
    /// The caller may not read this path (another user's process).
    PermissionDenied(PathBuf),
    /// The record was read but a key or field was missing or malformed.
    Parse(String),
    /// The process table could not be listed; nothing in this cycle can be trusted.
    EnumerationFailed(String),
    /// Any other I/O error reading a record.
    Io(io::Error),
}

impl CollectError {
    /// Returns `false` only for errors that invalidate the whole cycle.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CollectError::EnumerationFailed(_))
    }

    /// Maps an I/O error from reading `path` onto the taxonomy.
    pub fn from_io(path: impl Into<PathBuf>, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => CollectError::NotFound(path.into()),
            io::ErrorKind::PermissionDenied => CollectError::PermissionDenied(path.into()),
            _ => CollectError::Io(e),
        }
    }
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::NotFound(path) => write!(f, "{} not found", path.display()),
            CollectError::PermissionDenied(path) => {
                write!(f, "permission denied reading {}", path.display())
            }
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
            CollectError::EnumerationFailed(msg) => {
                write!(f, "process enumeration failed: {}", msg)
            }
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CollectError {
    fn from(e: io::Error) -> Self {
        CollectError::Io(e)
    }
}

impl From<ParseError> for CollectError {
    fn from(e: ParseError) -> Self {
        CollectError::Parse(e.message)
    }
}
