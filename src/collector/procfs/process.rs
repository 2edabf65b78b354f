//! Process collector for per-process metrics from `/proc/[pid]/`.

use std::path::PathBuf;

use tracing::debug;

use super::error::CollectError;
use super::parser::{
    ProcStatus, UNKNOWN_USER, UserResolver, parse_cmdline, parse_proc_stat, parse_proc_status,
};
use super::reader::RecordReader;
use crate::collector::traits::FileSystem;
use crate::model::{ProcessCpuTimes, ProcessInfo};
use crate::rates::{TickRate, kb_to_gb, process_cpu_percent, process_uptime_secs};

/// Per-cycle inputs shared by every process row.
///
/// Read once per cycle, before any process is touched.
pub struct ProcessContext<'a> {
    /// System uptime in whole seconds; `None` if `/proc/uptime` was unreadable.
    pub uptime_secs: Option<u64>,
    pub tick_rate: TickRate,
    pub users: &'a UserResolver,
}

/// Collects process information from `/proc/[pid]/` files.
pub struct ProcessCollector<F: FileSystem> {
    reader: RecordReader<F>,
    proc_path: PathBuf,
}

impl<F: FileSystem> ProcessCollector<F> {
    /// Creates a new process collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            reader: RecordReader::new(fs),
            proc_path: proc_path.into(),
        }
    }

    fn path(&self, pid: u32, file: &str) -> PathBuf {
        self.proc_path.join(pid.to_string()).join(file)
    }

    /// Command line from `/proc/[pid]/cmdline`; empty for kernel threads.
    pub fn collect_cmdline(&self, pid: u32) -> Result<String, CollectError> {
        let cmdline = self.reader.open(self.path(pid, "cmdline"))?;
        Ok(parse_cmdline(cmdline.content()))
    }

    /// Parsed `/proc/[pid]/status`.
    pub fn collect_status(&self, pid: u32) -> Result<ProcStatus, CollectError> {
        let status = self.reader.open(self.path(pid, "status"))?;
        Ok(parse_proc_status(&status))
    }

    /// `VmData` in GiB.
    pub fn collect_vm_data_gb(&self, pid: u32) -> Result<f64, CollectError> {
        self.collect_status(pid)?
            .vm_data_kb
            .map(kb_to_gb)
            .ok_or_else(|| CollectError::Parse(format!("no VmData for pid {}", pid)))
    }

    /// Real uid from `/proc/[pid]/status`.
    pub fn collect_uid(&self, pid: u32) -> Result<u32, CollectError> {
        self.collect_status(pid)?
            .uid
            .ok_or_else(|| CollectError::Parse(format!("no Uid for pid {}", pid)))
    }

    /// Login name of the process owner, or `"unknown"` when the uid has no entry.
    pub fn collect_user(&self, pid: u32, users: &UserResolver) -> Result<String, CollectError> {
        Ok(users.resolve_or_unknown(self.collect_uid(pid)?))
    }

    /// Thread count from `/proc/[pid]/status`.
    pub fn collect_threads(&self, pid: u32) -> Result<u32, CollectError> {
        self.collect_status(pid)?
            .threads
            .ok_or_else(|| CollectError::Parse(format!("no Threads for pid {}", pid)))
    }

    /// Start time and CPU ticks from `/proc/[pid]/stat`.
    pub fn collect_cpu_times(&self, pid: u32) -> Result<ProcessCpuTimes, CollectError> {
        let stat = self.reader.open(self.path(pid, "stat"))?;
        Ok(parse_proc_stat(stat.first_line().unwrap_or(""))?)
    }

    /// Builds one process row.
    ///
    /// Returns an error only when a file is gone or unreadable; a malformed
    /// record degrades the affected fields to `None` instead.
    pub fn collect_process(
        &self,
        pid: u32,
        ctx: &ProcessContext<'_>,
    ) -> Result<ProcessInfo, CollectError> {
        let times = match self.collect_cpu_times(pid) {
            Ok(times) => Some(times),
            Err(CollectError::Parse(msg)) => {
                debug!(pid, "stat unusable: {}", msg);
                None
            }
            Err(e) => return Err(e),
        };
        let status = self.collect_status(pid)?;
        let command = self.collect_cmdline(pid)?;

        let user = status
            .uid
            .map(|uid| ctx.users.resolve_or_unknown(uid))
            .unwrap_or_else(|| UNKNOWN_USER.to_string());

        let cpu_percent = match (times, ctx.uptime_secs) {
            (Some(t), Some(uptime)) => process_cpu_percent(&t, uptime, ctx.tick_rate),
            _ => None,
        };

        Ok(ProcessInfo {
            pid,
            user,
            command,
            virtual_memory_gb: status.vm_data_kb.map(kb_to_gb),
            cpu_percent,
            up_time_secs: times.map(|t| process_uptime_secs(t.start_ticks, ctx.tick_rate)),
            threads: status.threads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    fn context(users: &UserResolver) -> ProcessContext<'_> {
        ProcessContext {
            uptime_secs: Some(12345),
            tick_rate: TickRate::new(100),
            users,
        }
    }

    fn typical_users() -> UserResolver {
        UserResolver::from_content(
            "root:x:0:0:root:/root:/bin/bash\npostgres:x:999:999::/var/lib/postgresql:/bin/bash\nuser:x:1000:1000::/home/user:/bin/bash\n",
        )
    }

    #[test]
    fn test_collect_cmdline() {
        let collector = ProcessCollector::new(MockFs::typical_system(), "/proc");
        assert_eq!(collector.collect_cmdline(1).unwrap(), "/sbin/init\0splash\0");
        assert_eq!(collector.collect_cmdline(2).unwrap(), "");
    }

    #[test]
    fn test_collect_vm_data_gb() {
        let collector = ProcessCollector::new(MockFs::typical_system(), "/proc");
        assert_eq!(collector.collect_vm_data_gb(1001).unwrap(), 1.0);
        // Kernel threads have no VmData
        assert!(matches!(
            collector.collect_vm_data_gb(2),
            Err(CollectError::Parse(_))
        ));
    }

    #[test]
    fn test_collect_cpu_times() {
        let collector = ProcessCollector::new(MockFs::typical_system(), "/proc");
        let times = collector.collect_cpu_times(1000).unwrap();
        assert_eq!(times.start_ticks, 100000);
        assert_eq!(times.total_ticks(), 450);
    }

    #[test]
    fn test_collect_user() {
        let collector = ProcessCollector::new(MockFs::typical_system(), "/proc");
        let users = typical_users();
        assert_eq!(collector.collect_user(1, &users).unwrap(), "root");
        assert_eq!(collector.collect_user(1001, &users).unwrap(), "postgres");
        assert_eq!(collector.collect_threads(1001).unwrap(), 8);
    }

    #[test]
    fn test_collect_process() {
        let collector = ProcessCollector::new(MockFs::typical_system(), "/proc");
        let users = typical_users();
        let info = collector.collect_process(1000, &context(&users)).unwrap();

        assert_eq!(info.pid, 1000);
        assert_eq!(info.user, "user");
        assert_eq!(info.command, "-bash\0");
        assert_eq!(info.up_time_secs, Some(1000.0));
        assert_eq!(info.threads, Some(1));
        // 450 ticks = 4.5s over 12345 - 1000 = 11345s
        let expected = 100.0 * 4.5 / 11345.0;
        assert!((info.cpu_percent.unwrap() - expected).abs() < 1e-9);
        let gb = info.virtual_memory_gb.unwrap();
        assert!((gb - 2000.0 / 1048576.0).abs() < 1e-12);
    }

    #[test]
    fn test_collect_process_gone() {
        let mut fs = MockFs::new();
        fs.add_dir("/proc/9999"); // Directory exists but no files

        let collector = ProcessCollector::new(fs, "/proc");
        let users = UserResolver::new();
        let result = collector.collect_process(9999, &context(&users));

        assert!(matches!(result, Err(CollectError::NotFound(_))));
    }

    #[test]
    fn test_collect_process_permission_denied() {
        let collector = ProcessCollector::new(MockFs::with_problem_processes(), "/proc");
        let users = typical_users();
        let result = collector.collect_process(4242, &context(&users));
        assert!(matches!(result, Err(CollectError::PermissionDenied(_))));
    }

    #[test]
    fn test_collect_process_malformed_stat_degrades() {
        let collector = ProcessCollector::new(MockFs::with_problem_processes(), "/proc");
        let users = typical_users();
        let info = collector.collect_process(4343, &context(&users)).unwrap();

        assert_eq!(info.user, "user");
        assert_eq!(info.command, "./broken\0");
        assert_eq!(info.cpu_percent, None);
        assert_eq!(info.up_time_secs, None);
        assert!(info.virtual_memory_gb.is_some());
    }

    #[test]
    fn test_collect_process_without_uptime() {
        let collector = ProcessCollector::new(MockFs::typical_system(), "/proc");
        let users = typical_users();
        let ctx = ProcessContext {
            uptime_secs: None,
            tick_rate: TickRate::new(100),
            users: &users,
        };
        let info = collector.collect_process(1, &ctx).unwrap();
        assert_eq!(info.cpu_percent, None);
        assert_eq!(info.up_time_secs, Some(0.01));
    }
}
