//! Readers for the Linux `/proc` filesystem.
//!
//! `reader` turns a file into whitespace-separated records, `parser` extracts
//! counters from those records, and the collectors wrap both behind the
//! [`FileSystem`](crate::collector::traits::FileSystem) trait.

pub mod enumerate;
pub mod error;
pub mod parser;
pub mod process;
pub mod reader;
pub mod system;

pub use enumerate::ProcessEnumerator;
pub use error::CollectError;
pub use parser::UserResolver;
pub use process::{ProcessCollector, ProcessContext};
pub use reader::{RecordReader, Records};
pub use system::SystemCollector;
