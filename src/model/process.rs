//! Per-process metrics collected from `/proc/[pid]/`.

use serde::{Deserialize, Serialize};

/// Raw tick counters from `/proc/[pid]/stat`.
///
/// All values are in clock ticks (USER_HZ).
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct ProcessCpuTimes {
    /// Ticks after boot at which the process started (field 22, starttime).
    pub start_ticks: u64,
    /// User-mode ticks (field 14, utime).
    pub utime: u64,
    /// Kernel-mode ticks (field 15, stime).
    pub stime: u64,
    /// User-mode ticks of waited-for children (field 16, cutime).
    pub cutime: u64,
    /// Kernel-mode ticks of waited-for children (field 17, cstime).
    pub cstime: u64,
}

impl ProcessCpuTimes {
    /// Ticks spent by the process and its reaped children.
    pub fn total_ticks(&self) -> u64 {
        [self.utime, self.stime, self.cutime, self.cstime]
            .into_iter()
            .fold(0, u64::saturating_add)
    }
}

/// One row of the process table.
///
/// Recomputed from scratch on every poll cycle.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Login name of the real uid, or `"unknown"`.
    pub user: String,
    /// Command line, empty for kernel threads.
    pub command: String,
    /// `VmData` in GiB.
    pub virtual_memory_gb: Option<f64>,
    /// Lifetime-average CPU share, 0..=100.
    pub cpu_percent: Option<f64>,
    /// Process start offset from boot, in seconds.
    pub up_time_secs: Option<f64>,
    /// `Threads:` from `/proc/[pid]/status`.
    pub threads: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_ticks() {
        let times = ProcessCpuTimes {
            start_ticks: 100,
            utime: 5,
            stime: 3,
            cutime: 2,
            cstime: 1,
        };
        assert_eq!(times.total_ticks(), 11);
    }

    #[test]
    fn test_total_ticks_saturates() {
        let times = ProcessCpuTimes {
            utime: u64::MAX,
            stime: 7,
            ..Default::default()
        };
        assert_eq!(times.total_ticks(), u64::MAX);
    }
}
