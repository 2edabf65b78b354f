//! Counter-to-rate conversions.
//!
//! This module is the single place where raw ticks and kilobytes turn into
//! percentages and seconds. Everything here is pure: the tick rate and the
//! previous CPU samples are passed in, never read from globals.

use std::collections::HashMap;

use crate::model::{CpuId, CpuSample, CpuUsage, ProcessCpuTimes};

// ---------------------------------------------------------------------------
// Tick rate
// ---------------------------------------------------------------------------

/// Scheduler clock ticks per second (USER_HZ).
///
/// Detect once and pass the same value to every calculation in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRate(u64);

impl TickRate {
    /// USER_HZ on every mainstream Linux architecture.
    pub const DEFAULT_HZ: u64 = 100;

    /// Creates a tick rate; zero is replaced by [`Self::DEFAULT_HZ`].
    pub fn new(hz: u64) -> Self {
        if hz == 0 {
            Self(Self::DEFAULT_HZ)
        } else {
            Self(hz)
        }
    }

    /// Queries `sysconf(_SC_CLK_TCK)`, falling back to 100.
    #[cfg(unix)]
    pub fn detect() -> Self {
        // SAFETY: sysconf has no side effects and is thread-safe for this query.
        let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if hz > 0 {
            Self(hz as u64)
        } else {
            Self(Self::DEFAULT_HZ)
        }
    }

    #[cfg(not(unix))]
    pub fn detect() -> Self {
        Self(Self::DEFAULT_HZ)
    }

    pub fn hz(&self) -> u64 {
        self.0
    }

    /// Converts ticks to seconds.
    pub fn ticks_to_secs(&self, ticks: u64) -> f64 {
        ticks as f64 / self.0 as f64
    }
}

impl Default for TickRate {
    fn default() -> Self {
        Self(Self::DEFAULT_HZ)
    }
}

// ---------------------------------------------------------------------------
// System CPU
// ---------------------------------------------------------------------------

/// CPU utilization between an earlier and a later sample of the same CPU.
///
/// `100 * Δactive / (Δactive + Δidle)`. Returns `None` when no ticks
/// elapsed or when a counter went backwards (the samples are not comparable).
pub fn cpu_percent(prev: &CpuSample, curr: &CpuSample) -> Option<f64> {
    let active = curr.active_ticks().checked_sub(prev.active_ticks())?;
    let idle = curr.idle_ticks().checked_sub(prev.idle_ticks())?;
    let total = active.saturating_add(idle);
    if total == 0 {
        return None;
    }
    Some((100.0 * active as f64 / total as f64).clamp(0.0, 100.0))
}

/// Previous CPU samples, keyed by CPU identity.
///
/// The only state carried from one cycle to the next.
#[derive(Debug, Default)]
pub struct CpuRateState {
    pub prev_sample: HashMap<CpuId, CpuSample>,
}

impl CpuRateState {
    pub fn reset(&mut self) {
        self.prev_sample.clear();
    }

    /// Computes usage for every sample against the previous cycle, then
    /// replaces the stored samples with `samples`.
    ///
    /// Identities seen for the first time get `percent: None`. Identities
    /// absent from `samples` (offlined cores) are forgotten.
    pub fn update(&mut self, samples: &[CpuSample]) -> Vec<CpuUsage> {
        let usages = samples
            .iter()
            .map(|curr| CpuUsage {
                id: curr.id,
                percent: self
                    .prev_sample
                    .get(&curr.id)
                    .and_then(|prev| cpu_percent(prev, curr)),
            })
            .collect();

        self.prev_sample = samples.iter().map(|s| (s.id, s.clone())).collect();
        usages
    }
}

// ---------------------------------------------------------------------------
// Per-process
// ---------------------------------------------------------------------------

/// Lifetime-average CPU share of a process.
///
/// `100 * (total_ticks / hz) / (uptime - start_ticks / hz)`. This is the
/// average since the process started, not the current rate. `None` when the
/// process appears to have started at or after `uptime_secs` (it started
/// within the current second, or the uptime read is stale).
pub fn process_cpu_percent(times: &ProcessCpuTimes, uptime_secs: u64, rate: TickRate) -> Option<f64> {
    let elapsed = uptime_secs as f64 - rate.ticks_to_secs(times.start_ticks);
    if elapsed <= 0.0 {
        return None;
    }
    let busy = rate.ticks_to_secs(times.total_ticks());
    Some((100.0 * busy / elapsed).clamp(0.0, 100.0))
}

/// Process start offset from boot, in seconds.
pub fn process_uptime_secs(start_ticks: u64, rate: TickRate) -> f64 {
    rate.ticks_to_secs(start_ticks)
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Fraction of memory in use: `1 - free / (total - buffers)`, clamped to 0..=1.
///
/// `None` when `total <= buffers`.
pub fn memory_used_fraction(total_kb: u64, free_kb: u64, buffers_kb: u64) -> Option<f64> {
    let usable = total_kb.checked_sub(buffers_kb).filter(|&d| d > 0)?;
    Some((1.0 - free_kb as f64 / usable as f64).clamp(0.0, 1.0))
}

/// Kilobytes to gigabytes (KiB / 1024²).
pub fn kb_to_gb(kb: u64) -> f64 {
    kb as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cpu(id: CpuId, fields: [u64; 10]) -> CpuSample {
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
    fn test_cpu_percent_two_samples() {
        let s1 = cpu(CpuId::Aggregate, [100, 0, 50, 800, 0, 0, 0, 0, 0, 0]);
        let s2 = cpu(CpuId::Aggregate, [150, 0, 60, 850, 0, 0, 0, 0, 0, 0]);
        let pct = cpu_percent(&s1, &s2).unwrap();
        assert!((pct - 100.0 * 60.0 / 110.0).abs() < 1e-9);
        assert!((pct - 54.545).abs() < 0.01);
    }

    #[test]
    fn test_cpu_percent_identical_samples_unavailable() {
        let s = cpu(CpuId::Aggregate, [100, 0, 50, 800, 0, 0, 0, 0, 0, 0]);
        // No ticks elapsed: undefined, not NaN and not 0
        assert_eq!(cpu_percent(&s, &s), None);
    }

    #[test]
    fn test_cpu_percent_idle_only_is_zero() {
        let s1 = cpu(CpuId::Core(0), [100, 0, 50, 800, 0, 0, 0, 0, 0, 0]);
        let s2 = cpu(CpuId::Core(0), [100, 0, 50, 900, 5, 0, 0, 0, 0, 0]);
        assert_eq!(cpu_percent(&s1, &s2), Some(0.0));
    }

    #[test]
    fn test_cpu_percent_counter_regression() {
        let s1 = cpu(CpuId::Core(1), [100, 0, 50, 800, 0, 0, 0, 0, 0, 0]);
        let s2 = cpu(CpuId::Core(1), [10, 0, 5, 80, 0, 0, 0, 0, 0, 0]);
        assert_eq!(cpu_percent(&s1, &s2), None);
    }

    #[test]
    fn test_cpu_percent_huge_deltas_do_not_overflow() {
        let s1 = cpu(CpuId::Aggregate, [0; 10]);
        let s2 = cpu(CpuId::Aggregate, [u64::MAX, 0, 0, u64::MAX, 0, 0, 0, 0, 0, 0]);
        let pct = cpu_percent(&s1, &s2).unwrap();
        assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn test_process_cpu_percent_huge_ticks_clamped() {
        let times = ProcessCpuTimes {
            start_ticks: 0,
            utime: u64::MAX,
            stime: u64::MAX,
            ..Default::default()
        };
        assert_eq!(process_cpu_percent(&times, 10, TickRate::new(100)), Some(100.0));
    }

    #[test]
    fn test_cpu_rate_state_per_identity() {
        let mut state = CpuRateState::default();
        let first = vec![
            cpu(CpuId::Aggregate, [100, 0, 0, 100, 0, 0, 0, 0, 0, 0]),
            cpu(CpuId::Core(0), [50, 0, 0, 50, 0, 0, 0, 0, 0, 0]),
        ];
        let usages = state.update(&first);
        assert!(usages.iter().all(|u| u.percent.is_none()));

        let second = vec![
            cpu(CpuId::Aggregate, [150, 0, 0, 150, 0, 0, 0, 0, 0, 0]),
            cpu(CpuId::Core(0), [100, 0, 0, 50, 0, 0, 0, 0, 0, 0]),
            cpu(CpuId::Core(1), [10, 0, 0, 10, 0, 0, 0, 0, 0, 0]),
        ];
        let usages = state.update(&second);
        assert_eq!(usages[0].percent, Some(50.0));
        assert_eq!(usages[1].percent, Some(100.0));
        // Core 1 came online this cycle
        assert_eq!(usages[2].id, CpuId::Core(1));
        assert_eq!(usages[2].percent, None);
        assert_eq!(state.prev_sample.len(), 3);

        state.reset();
        assert!(state.prev_sample.is_empty());
    }

    #[test]
    fn test_process_cpu_percent_lifetime_average() {
        let times = ProcessCpuTimes {
            start_ticks: 100000,
            utime: 100,
            stime: 50,
            cutime: 200,
            cstime: 100,
        };
        let pct = process_cpu_percent(&times, 12345, TickRate::new(100)).unwrap();
        assert!((pct - 100.0 * 4.5 / 11345.0).abs() < 1e-9);
    }

    #[test]
    fn test_process_cpu_percent_no_elapsed_time() {
        let times = ProcessCpuTimes {
            start_ticks: 500000,
            utime: 10,
            ..Default::default()
        };
        assert_eq!(process_cpu_percent(&times, 5000, TickRate::new(100)), None);
    }

    #[test]
    fn test_process_cpu_percent_clamped() {
        // 8 busy threads since start: lifetime share above one CPU
        let times = ProcessCpuTimes {
            start_ticks: 0,
            utime: 8000,
            ..Default::default()
        };
        assert_eq!(process_cpu_percent(&times, 10, TickRate::new(100)), Some(100.0));
    }

    #[test]
    fn test_process_uptime_secs() {
        assert_eq!(process_uptime_secs(100000, TickRate::new(100)), 1000.0);
        assert_eq!(process_uptime_secs(2500, TickRate::new(250)), 10.0);
    }

    #[test]
    fn test_tick_rate() {
        assert_eq!(TickRate::new(0).hz(), TickRate::DEFAULT_HZ);
        assert_eq!(TickRate::default().hz(), 100);
        assert!(TickRate::detect().hz() > 0);
    }

    #[test]
    fn test_memory_used_fraction() {
        let f = memory_used_fraction(2000000, 500000, 100000).unwrap();
        assert!((f - (1.0 - 500000.0 / 1900000.0)).abs() < 1e-12);
        assert!((f - 0.7368).abs() < 1e-4);
    }

    #[test]
    fn test_memory_used_fraction_edges() {
        // free + buffers == total
        assert_eq!(memory_used_fraction(1000, 900, 100), Some(0.0));
        assert_eq!(memory_used_fraction(1000, 0, 0), Some(1.0));
        assert_eq!(memory_used_fraction(100, 10, 100), None);
        assert_eq!(memory_used_fraction(100, 10, 200), None);
    }

    #[test]
    fn test_kb_to_gb() {
        assert_eq!(kb_to_gb(1048576), 1.0);
        assert_eq!(kb_to_gb(0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_cpu_percent_in_range(
            base in prop::array::uniform10(0u64..1_000_000),
            delta in prop::array::uniform10(0u64..1_000_000),
        ) {
            let s1 = cpu(CpuId::Aggregate, base);
            let mut later = base;
            for (v, d) in later.iter_mut().zip(delta) {
                *v += d;
            }
            let s2 = cpu(CpuId::Aggregate, later);
            match cpu_percent(&s1, &s2) {
                Some(p) => prop_assert!((0.0..=100.0).contains(&p)),
                None => prop_assert_eq!(s1.active_ticks() + s1.idle_ticks(), s2.active_ticks() + s2.idle_ticks()),
            }
        }

        #[test]
        fn prop_identical_samples_never_report_usage(fields in prop::array::uniform10(0u64..1_000_000)) {
            let s = cpu(CpuId::Core(0), fields);
            let p = cpu_percent(&s, &s);
            prop_assert!(p.is_none() || p == Some(0.0));
        }

        #[test]
        fn prop_memory_fraction_in_range(free in 0u64..1_000_000, buffers in 0u64..1_000_000, extra in 1u64..1_000_000) {
            let total = free + buffers + extra;
            let f = memory_used_fraction(total, free, buffers).unwrap();
            prop_assert!((0.0..=1.0).contains(&f));
        }
    }
}
