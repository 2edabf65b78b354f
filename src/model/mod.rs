//! Data model produced by one poll cycle.
//!
//! - [`system`]: system-wide snapshot and CPU counter samples
//! - [`process`]: per-process rows and raw per-process tick counters
//!
//! Every derived value that can be missing on a given host is an `Option`;
//! `None` is the "unavailable" marker and serializes as `null`.

pub mod process;
pub mod system;

pub use process::{ProcessCpuTimes, ProcessInfo};
pub use system::{CpuId, CpuSample, CpuUsage, SystemSnapshot};
