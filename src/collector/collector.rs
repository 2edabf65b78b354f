//! Poll cycle that ties the `/proc` readers together.
//!
//! The `Collector` owns the only cross-cycle state (previous CPU samples)
//! and produces one [`PollCycle`] per call.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::collector::procfs::{
    CollectError, ProcessCollector, ProcessContext, ProcessEnumerator, SystemCollector,
    UserResolver,
};
use crate::collector::traits::FileSystem;
use crate::model::{CpuId, ProcessInfo, SystemSnapshot};
use crate::rates::{CpuRateState, TickRate};

/// Where the collector looks for its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Root of the proc filesystem.
    pub proc_path: PathBuf,
    pub os_release_path: PathBuf,
    pub passwd_path: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            proc_path: PathBuf::from("/proc"),
            os_release_path: PathBuf::from("/etc/os-release"),
            passwd_path: PathBuf::from("/etc/passwd"),
        }
    }
}

/// Timing information for each phase of a cycle.
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CollectorTiming {
    /// Total cycle time.
    pub total: Duration,
    /// Time to list `/proc`.
    pub enumerate: Duration,
    /// Time to read all system-wide counters.
    pub system: Duration,
    /// Time to load the user table.
    pub users: Duration,
    /// Time to read every process.
    pub processes: Duration,
}

/// Result of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollCycle {
    /// Unix timestamp (seconds) taken at the start of the cycle.
    pub timestamp: i64,
    pub system: SystemSnapshot,
    /// One row per process that was readable, ordered by pid.
    pub processes: Vec<ProcessInfo>,
}

/// Main collector that gathers system and process metrics.
pub struct Collector<F: FileSystem + Clone> {
    fs: F,
    config: CollectorConfig,
    tick_rate: TickRate,
    enumerator: ProcessEnumerator<F>,
    system_collector: SystemCollector<F>,
    process_collector: ProcessCollector<F>,
    cpu_state: CpuRateState,
    /// Timing information from the last collect_cycle call.
    last_timing: Option<CollectorTiming>,
}

impl<F: FileSystem + Clone> Collector<F> {
    /// Creates a new collector with the host's detected tick rate.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `config` - Input paths
    pub fn new(fs: F, config: CollectorConfig) -> Self {
        Self {
            enumerator: ProcessEnumerator::new(fs.clone(), &config.proc_path),
            system_collector: SystemCollector::new(
                fs.clone(),
                &config.proc_path,
                &config.os_release_path,
            ),
            process_collector: ProcessCollector::new(fs.clone(), &config.proc_path),
            fs,
            config,
            tick_rate: TickRate::detect(),
            cpu_state: CpuRateState::default(),
            last_timing: None,
        }
    }

    /// Overrides the detected tick rate.
    ///
    /// Mock scenarios are written for 100 Hz.
    pub fn with_tick_rate(mut self, tick_rate: TickRate) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn tick_rate(&self) -> TickRate {
        self.tick_rate
    }

    /// Returns timing information from the last `collect_cycle` call.
    pub fn last_timing(&self) -> Option<&CollectorTiming> {
        self.last_timing.as_ref()
    }

    /// Forgets the previous CPU samples; the next cycle reports no CPU percentages.
    pub fn reset_cpu_state(&mut self) {
        self.cpu_state.reset();
    }

    /// Runs one poll cycle.
    ///
    /// Order: list processes, read every system counter, load the user
    /// table, then read each listed process. Only an enumeration failure
    /// aborts the cycle. Any other failure leaves the affected fields `None`
    /// or drops the affected process row.
    pub fn collect_cycle(&mut self) -> Result<PollCycle, CollectError> {
        let total_start = Instant::now();
        let mut timing = CollectorTiming::default();
        let timestamp = Utc::now().timestamp();

        let start = Instant::now();
        let pids = self.enumerator.list_pids()?;
        timing.enumerate = start.elapsed();

        let start = Instant::now();
        let mut system = self.collect_system();
        timing.system = start.elapsed();

        let start = Instant::now();
        let users = self.load_users();
        timing.users = start.elapsed();

        let start = Instant::now();
        let ctx = ProcessContext {
            uptime_secs: system.up_time_secs,
            tick_rate: self.tick_rate,
            users: &users,
        };
        let mut processes = Vec::with_capacity(pids.len());
        for pid in pids {
            if !self.enumerator.is_pid_existing(pid) {
                trace!(pid, "process exited before read");
                continue;
            }
            match self.process_collector.collect_process(pid, &ctx) {
                Ok(info) => processes.push(info),
                Err(e @ (CollectError::NotFound(_) | CollectError::PermissionDenied(_))) => {
                    debug!(pid, "skipping process: {}", e);
                }
                Err(e) => warn!(pid, "skipping process: {}", e),
            }
        }
        processes.sort_by_key(|p| p.pid);
        timing.processes = start.elapsed();

        system.total_threads = processes
            .iter()
            .filter_map(|p| p.threads.map(u64::from))
            .reduce(|a, b| a + b);

        timing.total = total_start.elapsed();
        debug!(
            processes = processes.len(),
            elapsed_ms = timing.total.as_millis() as u64,
            "poll cycle complete"
        );
        self.last_timing = Some(timing);

        Ok(PollCycle {
            timestamp,
            system,
            processes,
        })
    }

    /// Reads every system-wide metric. Each one degrades to `None` on its own.
    fn collect_system(&mut self) -> SystemSnapshot {
        let sys = &self.system_collector;
        let mut snapshot = SystemSnapshot {
            os_name: degraded("os name", sys.collect_os_name()),
            kernel_version: degraded("kernel version", sys.collect_kernel_version()),
            core_count: degraded("core count", sys.collect_core_count()),
            up_time_secs: degraded("uptime", sys.collect_uptime()),
            ram_used_fraction: degraded("memory usage", sys.collect_memory_usage()),
            ..Default::default()
        };

        // The previous samples survive a failed read; the next successful
        // cycle compares against them across the longer interval.
        if let Some(stat) = degraded("/proc/stat", sys.collect_stat()) {
            snapshot.total_processes = stat.counts.total;
            snapshot.running_processes = stat.counts.running;

            for usage in self.cpu_state.update(&stat.cpus) {
                match usage.id {
                    CpuId::Aggregate => snapshot.cpu_percent = usage.percent,
                    CpuId::Core(_) => snapshot.core_percents.push(usage),
                }
            }
            for sample in stat.cpus {
                match sample.id {
                    CpuId::Aggregate => snapshot.cpu = Some(sample),
                    CpuId::Core(_) => snapshot.cores.push(sample),
                }
            }
        }

        snapshot
    }

    /// Loads the uid table for this cycle. A missing table resolves every uid to "unknown".
    fn load_users(&self) -> UserResolver {
        match self.fs.read_to_string(&self.config.passwd_path) {
            Ok(content) => {
                let users = UserResolver::from_content(&content);
                if !users.is_loaded() {
                    debug!("{}: no usable entries", self.config.passwd_path.display());
                }
                users
            }
            Err(e) => {
                debug!("{}: {}", self.config.passwd_path.display(), e);
                UserResolver::new()
            }
        }
    }
}

/// Turns a failed system read into `None`, logging why.
fn degraded<T>(what: &str, result: Result<T, CollectError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e @ CollectError::NotFound(_)) => {
            debug!("{} unavailable: {}", what, e);
            None
        }
        Err(e) => {
            warn!("{} unavailable: {}", what, e);
            None
        }
    }
}
