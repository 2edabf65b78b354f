//! System collector for global metrics from `/proc/` and os-release.

use std::path::PathBuf;

use super::error::CollectError;
use super::parser::{
    MemInfo, ProcessCounts, find_cpu_sample, parse_cpu_cores, parse_cpu_samples,
    parse_kernel_version, parse_meminfo, parse_os_pretty_name, parse_process_counts, parse_uptime,
};
use super::reader::RecordReader;
use crate::collector::traits::FileSystem;
use crate::model::{CpuId, CpuSample};
use crate::rates::memory_used_fraction;

/// Everything taken from a single read of `/proc/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatSummary {
    /// Aggregate first, then cores by index.
    pub cpus: Vec<CpuSample>,
    pub counts: ProcessCounts,
}

/// Collects system-wide metrics.
///
/// Every method performs its own read, so each metric can fail on its own.
pub struct SystemCollector<F: FileSystem> {
    reader: RecordReader<F>,
    proc_path: PathBuf,
    os_release_path: PathBuf,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `os_release_path` - Usually "/etc/os-release"
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, os_release_path: impl Into<PathBuf>) -> Self {
        Self {
            reader: RecordReader::new(fs),
            proc_path: proc_path.into(),
            os_release_path: os_release_path.into(),
        }
    }

    /// CPU counters for the aggregate line or one core, from `/proc/stat`.
    pub fn collect_cpu_sample(&self, id: CpuId) -> Result<CpuSample, CollectError> {
        let stat = self.reader.open(self.proc_path.join("stat"))?;
        Ok(find_cpu_sample(&stat, id)?)
    }

    /// CPU samples and process counters from one read of `/proc/stat`.
    pub fn collect_stat(&self) -> Result<StatSummary, CollectError> {
        let stat = self.reader.open(self.proc_path.join("stat"))?;
        Ok(StatSummary {
            cpus: parse_cpu_samples(&stat),
            counts: parse_process_counts(&stat),
        })
    }

    /// `processes` and `procs_running` from `/proc/stat`.
    pub fn collect_process_counts(&self) -> Result<ProcessCounts, CollectError> {
        let stat = self.reader.open(self.proc_path.join("stat"))?;
        Ok(parse_process_counts(&stat))
    }

    /// Raw counters from `/proc/meminfo`.
    pub fn collect_meminfo(&self) -> Result<MemInfo, CollectError> {
        let meminfo = self.reader.open(self.proc_path.join("meminfo"))?;
        Ok(parse_meminfo(&meminfo))
    }

    /// Fraction of memory in use, 0..=1, from one read of `/proc/meminfo`.
    pub fn collect_memory_usage(&self) -> Result<f64, CollectError> {
        let info = self.collect_meminfo()?;
        let (Some(total), Some(free), Some(buffers)) = (info.total_kb, info.free_kb, info.buffers_kb)
        else {
            return Err(CollectError::Parse(format!("missing meminfo counters: {:?}", info)));
        };
        memory_used_fraction(total, free, buffers).ok_or_else(|| {
            CollectError::Parse(format!(
                "inconsistent meminfo: total={} buffers={}",
                total, buffers
            ))
        })
    }

    /// Whole seconds since boot from `/proc/uptime`.
    pub fn collect_uptime(&self) -> Result<u64, CollectError> {
        let uptime = self.reader.open(self.proc_path.join("uptime"))?;
        Ok(parse_uptime(&uptime)?)
    }

    /// Core count from `/proc/cpuinfo`.
    pub fn collect_core_count(&self) -> Result<u32, CollectError> {
        let cpuinfo = self.reader.open(self.proc_path.join("cpuinfo"))?;
        Ok(parse_cpu_cores(&cpuinfo)?)
    }

    /// Kernel release from `/proc/version`.
    pub fn collect_kernel_version(&self) -> Result<String, CollectError> {
        let version = self.reader.open(self.proc_path.join("version"))?;
        Ok(parse_kernel_version(&version)?)
    }

    /// Distribution pretty name from os-release.
    pub fn collect_os_name(&self) -> Result<String, CollectError> {
        let os_release = self.reader.open(&self.os_release_path)?;
        Ok(parse_os_pretty_name(&os_release)?)
    }
}
