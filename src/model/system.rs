//! System-wide metrics derived from `/proc`, `/etc/os-release` and friends.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a CPU line in `/proc/stat`.
///
/// The aggregate line is labelled `cpu`, individual cores `cpu0`, `cpu1`, ...
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CpuId {
    Aggregate,
    Core(u32),
}

impl CpuId {
    /// Parses a `/proc/stat` line label (`cpu`, `cpu7`).
    pub fn from_label(label: &str) -> Option<Self> {
        let rest = label.strip_prefix("cpu")?;
        if rest.is_empty() {
            return Some(CpuId::Aggregate);
        }
        if !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse().ok().map(CpuId::Core)
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuId::Aggregate => write!(f, "cpu"),
            CpuId::Core(n) => write!(f, "cpu{}", n),
        }
    }
}

/// Cumulative CPU time counters for one CPU identity.
///
/// Source: `/proc/stat`, columns 1..=10 after the label, in clock ticks.
/// A single sample only gives cumulative totals; a rate needs two samples
/// (see [`crate::rates::cpu_percent`]).
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CpuSample {
    pub id: CpuId,
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuSample {
    /// Ticks spent doing work: everything except idle and iowait.
    pub fn active_ticks(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.irq,
            self.softirq,
            self.steal,
            self.guest,
            self.guest_nice,
        ]
        .into_iter()
        .fold(0, u64::saturating_add)
    }

    /// Ticks spent idle, including time waiting on I/O.
    pub fn idle_ticks(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }
}

/// Instantaneous utilization of one CPU identity between two poll cycles.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CpuUsage {
    pub id: CpuId,
    /// `None` on the first cycle, when no ticks elapsed, or after a counter reset.
    pub percent: Option<f64>,
}

/// Point-in-time view of the host.
///
/// Built fresh on every poll cycle and never mutated afterwards.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct SystemSnapshot {
    /// `PRETTY_NAME` from os-release, quotes stripped.
    pub os_name: Option<String>,
    /// Third token of the `Linux version` line in `/proc/version`.
    pub kernel_version: Option<String>,
    /// `cpu cores` from `/proc/cpuinfo` (first occurrence).
    pub core_count: Option<u32>,
    /// `processes` from `/proc/stat`: forks since boot.
    pub total_processes: Option<u64>,
    /// `procs_running` from `/proc/stat`.
    pub running_processes: Option<u32>,
    /// Sum of `Threads:` over every process enumerated in this cycle.
    pub total_threads: Option<u64>,
    /// Whole seconds since boot, from `/proc/uptime`.
    pub up_time_secs: Option<u64>,
    /// Aggregate CPU counters as read this cycle.
    pub cpu: Option<CpuSample>,
    /// Per-core CPU counters as read this cycle, ordered by core index.
    pub cores: Vec<CpuSample>,
    /// Aggregate CPU utilization since the previous cycle, 0..=100.
    pub cpu_percent: Option<f64>,
    /// Per-core utilization since the previous cycle.
    pub core_percents: Vec<CpuUsage>,
    /// Memory in use, 0..=1.
    pub ram_used_fraction: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: CpuId, fields: [u64; 10]) -> CpuSample {
        CpuSample {
            id,
            user: fields[0],
            nice: fields[1],
            system: fields[2],
            idle: fields[3],
            iowait: fields[4],
            irq: fields[5],
            softirq: fields[6],
            steal: fields[7],
            guest: fields[8],
            guest_nice: fields[9],
        }
    }

    #[test]
    fn test_cpu_id_from_label() {
        assert_eq!(CpuId::from_label("cpu"), Some(CpuId::Aggregate));
        assert_eq!(CpuId::from_label("cpu0"), Some(CpuId::Core(0)));
        assert_eq!(CpuId::from_label("cpu12"), Some(CpuId::Core(12)));
        assert_eq!(CpuId::from_label("cpux"), None);
        assert_eq!(CpuId::from_label("cpu+1"), None);
        assert_eq!(CpuId::from_label("intr"), None);
    }

    #[test]
    fn test_cpu_id_display_roundtrips_label() {
        assert_eq!(CpuId::Aggregate.to_string(), "cpu");
        assert_eq!(CpuId::Core(3).to_string(), "cpu3");
    }

    #[test]
    fn test_active_and_idle_ticks() {
        let s = sample(CpuId::Aggregate, [10, 1, 5, 100, 4, 2, 3, 1, 0, 0]);
        assert_eq!(s.active_ticks(), 10 + 1 + 5 + 2 + 3 + 1);
        assert_eq!(s.idle_ticks(), 104);
    }

    #[test]
    fn test_ticks_saturate_on_huge_counters() {
        let s = sample(CpuId::Aggregate, [u64::MAX, 1, 0, u64::MAX, 1, 0, 0, 0, 0, 0]);
        assert_eq!(s.active_ticks(), u64::MAX);
        assert_eq!(s.idle_ticks(), u64::MAX);
    }

    #[test]
    fn test_unavailable_serializes_as_null() {
        let snapshot = SystemSnapshot::default();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["ram_used_fraction"].is_null());
        assert!(json["cpu_percent"].is_null());
        assert!(json["os_name"].is_null());
    }
}
