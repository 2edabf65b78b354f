//! Host metrics collector for Linux.
//!
//! Reads system and process counters from the `/proc` filesystem. All reads
//! go through the [`FileSystem`] trait so the whole pipeline runs against
//! [`MockFs`] in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Collector                           │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │  ProcessEnumerator  │   │     SystemCollector         │  │
//! │  │  - /proc/[pid]/     │   │  - /proc/stat               │  │
//! │  ├─────────────────────┤   │  - /proc/meminfo            │  │
//! │  │  ProcessCollector   │   │  - /proc/uptime, version    │  │
//! │  │  - stat, status     │   │  - /proc/cpuinfo            │  │
//! │  │  - cmdline          │   │  - /etc/os-release          │  │
//! │  └──────────┬──────────┘   └──────────────┬──────────────┘  │
//! │             └──────────────┬──────────────┘                 │
//! │                     ┌──────▼──────┐                         │
//! │                     │ RecordReader│                         │
//! │                     └──────┬──────┘                         │
//! │                     ┌──────▼──────┐                         │
//! │                     │  FileSystem │ (trait)                 │
//! │                     └──────┬──────┘                         │
//! └────────────────────────────┼────────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!       ┌──────▼──────┐ ┌──────▼──────┐ ┌──────▼──────┐
//!       │   RealFs    │ │   MockFs    │ │  Scenarios  │
//!       │ (Linux)     │ │ (Testing)   │ │ (Fixtures)  │
//!       └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use hostsnap::collector::{Collector, CollectorConfig, RealFs};
//!
//! let mut collector = Collector::new(RealFs::new(), CollectorConfig::default());
//! let cycle = collector.collect_cycle().unwrap();
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use hostsnap::collector::{Collector, CollectorConfig, MockFs};
//!
//! let fs = MockFs::typical_system();
//! let mut collector = Collector::new(fs, CollectorConfig::default());
//! let cycle = collector.collect_cycle().unwrap();
//! assert_eq!(cycle.processes.len(), 4);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod procfs;
pub mod traits;

pub use collector::{Collector, CollectorConfig, CollectorTiming, PollCycle};
pub use mock::MockFs;
pub use procfs::CollectError;
pub use traits::{FileSystem, RealFs};
