//! Parsers for `/proc` and `/etc` record files.
//!
//! These are pure functions over already-read [`Records`], so they can be
//! tested with string inputs. Field positions and key names live in the
//! constants below; a kernel layout change is a one-line fix here.

use std::collections::HashMap;

use tracing::debug;

use super::reader::{Records, tokenize};
use crate::model::{CpuId, CpuSample, ProcessCpuTimes};

/// 1-based field numbers in `/proc/[pid]/stat`, as documented in proc(5).
pub mod stat_field {
    /// First field after `pid` (1) and `(comm)` (2).
    pub const FIRST_AFTER_COMM: usize = 3;
    pub const UTIME: usize = 14;
    pub const STIME: usize = 15;
    pub const CUTIME: usize = 16;
    pub const CSTIME: usize = 17;
    pub const STARTTIME: usize = 22;
}

/// Key names and line prefixes looked up in the record files.
pub mod keys {
    /// Used as the "total" memory counter.
    pub const MEM_TOTAL: &str = "MemAvailable:";
    pub const MEM_FREE: &str = "MemFree:";
    pub const MEM_BUFFERS: &str = "Buffers:";
    pub const PROCESSES: &str = "processes";
    pub const PROCS_RUNNING: &str = "procs_running";
    pub const CPU_CORES: &str = "cpu cores";
    pub const KERNEL_VERSION: &str = "Linux version ";
    pub const PRETTY_NAME: &str = "PRETTY_NAME=";
    pub const UID: &str = "Uid:";
    pub const VM_DATA: &str = "VmData:";
    pub const THREADS: &str = "Threads:";
}

/// Minimum number of counters on a `/proc/stat` cpu line (user nice system idle).
/// Later columns appeared in later kernels and count as zero when absent.
const CPU_MIN_COLUMNS: usize = 4;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

fn parse_num<T: std::str::FromStr>(token: Option<&&str>, name: &str) -> Result<T, ParseError> {
    token
        .ok_or_else(|| ParseError::new(format!("missing field {}", name)))?
        .parse()
        .map_err(|_| ParseError::new(format!("invalid {}", name)))
}

// ============ /proc/stat ============

/// Parses one tokenized `/proc/stat` cpu line (`cpu`, `cpu0`, ...).
pub fn parse_cpu_sample(tokens: &[&str]) -> Result<CpuSample, ParseError> {
    let label = tokens
        .first()
        .ok_or_else(|| ParseError::new("empty cpu line"))?;
    let id = CpuId::from_label(label)
        .ok_or_else(|| ParseError::new(format!("not a cpu line: {}", label)))?;

    let values = &tokens[1..];
    if values.len() < CPU_MIN_COLUMNS {
        return Err(ParseError::new(format!(
            "not enough columns for {}: expected {}+, got {}",
            label,
            CPU_MIN_COLUMNS,
            values.len()
        )));
    }

    let col = |idx: usize, name: &str| -> Result<u64, ParseError> {
        match values.get(idx) {
            Some(v) => v
                .parse()
                .map_err(|_| ParseError::new(format!("invalid {} for {}", name, label))),
            None => Ok(0),
        }
    };

    Ok(CpuSample {
        id,
        user: col(0, "user")?,
        nice: col(1, "nice")?,
        system: col(2, "system")?,
        idle: col(3, "idle")?,
        iowait: col(4, "iowait")?,
        irq: col(5, "irq")?,
        softirq: col(6, "softirq")?,
        steal: col(7, "steal")?,
        guest: col(8, "guest")?,
        guest_nice: col(9, "guest_nice")?,
    })
}

/// Finds the cpu line for `id` in `/proc/stat`.
pub fn find_cpu_sample(stat: &Records, id: CpuId) -> Result<CpuSample, ParseError> {
    let label = id.to_string();
    let tokens = stat
        .find_keyed(&label)
        .ok_or_else(|| ParseError::new(format!("no {} line in {}", label, stat.path().display())))?;
    parse_cpu_sample(&tokens)
}

/// Parses every cpu line in `/proc/stat`: aggregate first, then cores by index.
///
/// A malformed line is skipped; the remaining lines still count.
pub fn parse_cpu_samples(stat: &Records) -> Vec<CpuSample> {
    let mut samples: Vec<CpuSample> = stat
        .records()
        .filter(|r| CpuId::from_label(r[0]).is_some())
        .filter_map(|r| match parse_cpu_sample(&r) {
            Ok(sample) => Some(sample),
            Err(e) => {
                debug!("skipping {} line: {}", r[0], e.message);
                None
            }
        })
        .collect();
    samples.sort_by_key(|s| s.id);
    samples
}

/// Process counters from `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessCounts {
    /// Forks since boot.
    pub total: Option<u64>,
    /// Currently runnable.
    pub running: Option<u32>,
}

/// Extracts `processes` and `procs_running` from `/proc/stat`.
pub fn parse_process_counts(stat: &Records) -> ProcessCounts {
    let value = |key: &str| stat.find_keyed(key).and_then(|r| r.get(1).map(|v| v.to_string()));
    ProcessCounts {
        total: value(keys::PROCESSES).and_then(|v| v.parse().ok()),
        running: value(keys::PROCS_RUNNING).and_then(|v| v.parse().ok()),
    }
}

// ============ /proc/meminfo ============

/// The three `/proc/meminfo` counters the usage fraction needs, in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemInfo {
    pub total_kb: Option<u64>,
    pub free_kb: Option<u64>,
    pub buffers_kb: Option<u64>,
}

impl MemInfo {
    fn is_complete(&self) -> bool {
        self.total_kb.is_some() && self.free_kb.is_some() && self.buffers_kb.is_some()
    }
}

/// Parses `/proc/meminfo`, stopping once all three counters are found.
pub fn parse_meminfo(meminfo: &Records) -> MemInfo {
    let mut info = MemInfo::default();

    for line in meminfo.lines() {
        if info.is_complete() {
            break;
        }
        let kb = || tokenize(line).get(1).and_then(|v| v.parse().ok());
        if line.starts_with(keys::MEM_TOTAL) {
            info.total_kb = kb();
        } else if line.starts_with(keys::MEM_FREE) {
            info.free_kb = kb();
        } else if line.starts_with(keys::MEM_BUFFERS) {
            info.buffers_kb = kb();
        }
    }

    info
}

// ============ /proc/uptime, /proc/cpuinfo, /proc/version, os-release ============

/// Whole seconds since boot from the first field of `/proc/uptime`.
pub fn parse_uptime(uptime: &Records) -> Result<u64, ParseError> {
    let tokens = uptime.records().next().unwrap_or_default();
    let secs: f64 = parse_num(tokens.first(), "uptime")?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(ParseError::new(format!("invalid uptime {}", secs)));
    }
    Ok(secs.trunc() as u64)
}

/// Core count from the first `cpu cores` line of `/proc/cpuinfo`.
pub fn parse_cpu_cores(cpuinfo: &Records) -> Result<u32, ParseError> {
    let tokens = cpuinfo
        .find_prefixed(keys::CPU_CORES)
        .ok_or_else(|| ParseError::new("no 'cpu cores' line"))?;
    // cpu cores : 4
    parse_num(tokens.get(3), "cpu cores")
}

/// Kernel release: third token of the `Linux version` line.
pub fn parse_kernel_version(version: &Records) -> Result<String, ParseError> {
    let tokens = version
        .find_prefixed(keys::KERNEL_VERSION)
        .ok_or_else(|| ParseError::new("no 'Linux version' line"))?;
    tokens
        .get(2)
        .map(|v| v.to_string())
        .ok_or_else(|| ParseError::new("missing kernel release"))
}

/// `PRETTY_NAME` from os-release with surrounding quotes removed.
pub fn parse_os_pretty_name(os_release: &Records) -> Result<String, ParseError> {
    os_release
        .lines()
        .find_map(|line| line.strip_prefix(keys::PRETTY_NAME))
        .map(|value| value.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
        .ok_or_else(|| ParseError::new("no PRETTY_NAME in os-release"))
}

// ============ /proc/[pid]/* ============

/// Parses the tick counters out of `/proc/[pid]/stat`.
///
/// The comm field can contain spaces and parentheses, so fields are counted
/// from the last `)`.
pub fn parse_proc_stat(content: &str) -> Result<ProcessCpuTimes, ParseError> {
    let content = content.trim();
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;
    let fields = tokenize(&content[close_paren + 1..]);

    let field = |number: usize, name: &str| -> Result<u64, ParseError> {
        let token = fields.get(number - stat_field::FIRST_AFTER_COMM);
        // cutime/cstime are signed in the kernel ABI
        let value: i64 = parse_num(token, name)?;
        Ok(value.max(0) as u64)
    };

    Ok(ProcessCpuTimes {
        start_ticks: field(stat_field::STARTTIME, "starttime")?,
        utime: field(stat_field::UTIME, "utime")?,
        stime: field(stat_field::STIME, "stime")?,
        cutime: field(stat_field::CUTIME, "cutime")?,
        cstime: field(stat_field::CSTIME, "cstime")?,
    })
}

/// The fields read from `/proc/[pid]/status`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcStatus {
    /// Real uid.
    pub uid: Option<u32>,
    /// Data segment size, kB. Absent for kernel threads.
    pub vm_data_kb: Option<u64>,
    pub threads: Option<u32>,
}

/// Parses `/proc/[pid]/status`.
pub fn parse_proc_status(status: &Records) -> ProcStatus {
    let mut out = ProcStatus::default();
    for record in status.records() {
        let value = record.get(1);
        match record[0] {
            keys::UID => out.uid = value.and_then(|v| v.parse().ok()),
            keys::VM_DATA => out.vm_data_kb = value.and_then(|v| v.parse().ok()),
            keys::THREADS => out.threads = value.and_then(|v| v.parse().ok()),
            _ => {}
        }
    }
    out
}

/// First line of `/proc/[pid]/cmdline`, verbatim (NUL separators kept).
pub fn parse_cmdline(content: &str) -> String {
    content.lines().next().unwrap_or("").to_string()
}

// ============ /etc/passwd ============

/// Parses `/etc/passwd` content and returns a map of UID -> username.
///
/// Format: username:password:uid:gid:gecos:home:shell
pub fn parse_passwd(content: &str) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() >= 3
            && let Ok(uid) = parts[2].parse::<u32>()
        {
            // First entry wins, like getpwuid
            map.entry(uid).or_insert_with(|| parts[0].to_string());
        }
    }
    map
}

/// Name reported for a uid with no passwd entry.
pub const UNKNOWN_USER: &str = "unknown";

/// Resolver for UID -> username mapping.
///
/// Loaded once per poll cycle; the account database can change between cycles.
#[derive(Debug, Clone, Default)]
pub struct UserResolver {
    uid_to_name: HashMap<u32, String>,
}

impl UserResolver {
    /// Creates a new empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a resolver from `/etc/passwd` content.
    pub fn from_content(content: &str) -> Self {
        Self {
            uid_to_name: parse_passwd(content),
        }
    }

    /// Resolves UID to username.
    pub fn resolve(&self, uid: u32) -> Option<&str> {
        self.uid_to_name.get(&uid).map(String::as_str)
    }

    /// Resolves UID to username, or [`UNKNOWN_USER`].
    pub fn resolve_or_unknown(&self, uid: u32) -> String {
        self.resolve(uid).unwrap_or(UNKNOWN_USER).to_string()
    }

    /// Returns true if resolver has any mappings.
    pub fn is_loaded(&self) -> bool {
        !self.uid_to_name.is_empty()
    }
}
