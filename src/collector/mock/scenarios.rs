//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/etc` states for the
//! readers and the poll cycle.

use super::filesystem::MockFs;

/// Builds a `/proc/[pid]/stat` line with the tick fields the readers use.
///
/// Everything not passed in is filled with plausible constants.
fn stat_line(
    pid: u32,
    comm: &str,
    utime: u64,
    stime: u64,
    cutime: u64,
    cstime: u64,
    starttime: u64,
) -> String {
    format!(
        "{pid} ({comm}) S 1 {pid} {pid} 0 -1 4194560 1000 0 10 0 {utime} {stime} {cutime} {cstime} \
         20 0 1 0 {starttime} 25000000 2000 18446744073709551615 1 1 0 0 0 0 0 4096 0 0 0 0 17 0 \
         0 0 0 0 0 0 0 0 0 0 0 0 0"
    )
}

/// Builds a `/proc/[pid]/status` body.
fn status_body(name: &str, pid: u32, uid: u32, vm_data_kb: Option<u64>, threads: u32) -> String {
    let mut s = format!(
        "Name:\t{name}\nUmask:\t0022\nState:\tS (sleeping)\nTgid:\t{pid}\nPid:\t{pid}\nPPid:\t1\n\
         Uid:\t{uid}\t{uid}\t{uid}\t{uid}\nGid:\t{uid}\t{uid}\t{uid}\t{uid}\n"
    );
    if let Some(kb) = vm_data_kb {
        s.push_str(&format!(
            "VmPeak:\t  {} kB\nVmSize:\t  {} kB\nVmRSS:\t    4000 kB\nVmData:\t{:>8} kB\nVmStk:\t     132 kB\n",
            kb * 4,
            kb * 3,
            kb
        ));
    }
    s.push_str(&format!(
        "Threads:\t{threads}\nvoluntary_ctxt_switches:\t100\nnonvoluntary_ctxt_switches:\t5\n"
    ));
    s
}

impl MockFs {
    /// Creates a typical Debian host with four processes.
    ///
    /// Includes: init (PID 1), kthreadd (PID 2, kernel thread without
    /// cmdline or VmData), a bash shell (PID 1000) and a postgres backend
    /// (PID 1001). Clock ticks assume 100 Hz.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file(
            "/etc/passwd",
            "\
root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
bin:x:2:2:bin:/bin:/usr/sbin/nologin
postgres:x:999:999:PostgreSQL administrator:/var/lib/postgresql:/bin/bash
nobody:x:65534:65534:nobody:/nonexistent:/usr/sbin/nologin
user:x:1000:1000:User:/home/user:/bin/bash
",
        );
        fs.add_file(
            "/etc/os-release",
            "\
PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"
NAME=\"Debian GNU/Linux\"
VERSION_ID=\"12\"
VERSION=\"12 (bookworm)\"
ID=debian
",
        );

        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file(
            "/proc/version",
            "Linux version 6.1.0-18-amd64 (debian-kernel@lists.debian.org) \
             (gcc-12 (Debian 12.2.0-14) 12.2.0, GNU ld (GNU Binutils for Debian) 2.40) \
             #1 SMP PREEMPT_DYNAMIC Debian 6.1.76-1 (2024-02-01)\n",
        );
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
",
        );
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
softirq 200000 0 50000 10 20000 0 0 100 50000 0 79890
",
        );
        let mut cpuinfo = String::new();
        for n in 0..4 {
            cpuinfo.push_str(&format!(
                "processor\t: {n}\nvendor_id\t: GenuineIntel\nmodel name\t: Intel(R) Xeon(R) CPU\n\
                 physical id\t: 0\nsiblings\t: 4\ncore id\t\t: {n}\ncpu cores\t: 4\n\n"
            ));
        }
        fs.add_file("/proc/cpuinfo", cpuinfo);

        // Non-process entries the enumerator must skip
        fs.add_dir("/proc/self");
        fs.add_dir("/proc/net");
        fs.add_dir("/proc/sys");

        fs.add_process(
            1,
            &stat_line(1, "systemd", 150, 300, 2000, 1500, 1),
            &status_body("systemd", 1, 0, Some(18000), 1),
            "/sbin/init\0splash\0",
        );
        fs.add_process(
            2,
            &stat_line(2, "kthreadd", 0, 10, 0, 0, 2),
            &status_body("kthreadd", 2, 0, None, 1),
            "",
        );
        fs.add_process(
            1000,
            &stat_line(1000, "bash", 100, 50, 200, 100, 100000),
            &status_body("bash", 1000, 1000, Some(2000), 1),
            "-bash\0",
        );
        fs.add_process(
            1001,
            &stat_line(1001, "postgres", 5000, 1000, 0, 0, 200000),
            &status_body("postgres", 1001, 999, Some(1048576), 8),
            "postgres: checkpointer \0",
        );

        fs
    }

    /// Advances `typical_system` CPU counters as if ~1s passed.
    ///
    /// Aggregate: +60 active ticks, +50 idle ticks. `cpu0` is pegged,
    /// `cpu1..3` are idle, and `cpu3`'s idle counter went backwards
    /// (counter reset, e.g. CPU hotplug).
    pub fn advance_cpu_counters(&mut self) {
        self.add_file(
            "/proc/stat",
            "\
cpu  10050 500 3010 80050 1000 200 100 0 0 0
cpu0 2550 125 760 20000 250 50 25 0 0 0
cpu1 2500 125 750 20020 250 50 25 0 0 0
cpu2 2500 125 750 20020 250 50 25 0 0 0
cpu3 2500 125 750 10 250 50 25 0 0 0
ctxt 500100
btime 1700000000
processes 10003
procs_running 3
procs_blocked 0
",
        );
        self.add_file("/proc/uptime", "12346.68 98769.40\n");
    }

    /// Creates a stripped-down container environment.
    ///
    /// `/proc/stat` lacks the process counters, `/proc/meminfo` lacks
    /// `MemAvailable`, and neither `/proc/cpuinfo` nor `/etc/os-release`
    /// exist. One shell process runs as an uid with no passwd entry.
    pub fn minimal_container() -> Self {
        let mut fs = Self::new();

        fs.add_file("/etc/passwd", "root:x:0:0:root:/root:/bin/sh\n");
        fs.add_file("/proc/uptime", "86.20 80.11\n");
        fs.add_file("/proc/version", "Linux version 5.15.0-1057-aws (buildd@lcy02-amd64-101)\n");
        fs.add_file("/proc/meminfo", "MemTotal:  2048000 kB\nMemFree:  1024000 kB\nBuffers:  1000 kB\n");
        fs.add_file(
            "/proc/stat",
            "cpu  400 0 100 8000 0 0 0 0 0 0\ncpu0 400 0 100 8000 0 0 0 0 0 0\n",
        );

        fs.add_process(
            1,
            &stat_line(1, "sh", 20, 10, 0, 0, 500),
            &status_body("sh", 1, 10001, Some(512), 1),
            "/bin/sh\0-c\0sleep infinity\0",
        );

        fs
    }

    /// `typical_system` plus a process whose `status` cannot be read and
    /// one whose `stat` line is truncated.
    pub fn with_problem_processes() -> Self {
        let mut fs = Self::typical_system();

        fs.add_process(
            4242,
            &stat_line(4242, "sshd", 10, 10, 0, 0, 300000),
            &status_body("sshd", 4242, 0, Some(1024), 1),
            "sshd: root [priv]\0",
        );
        fs.deny("/proc/4242/status");

        fs.add_process(
            4343,
            "4343 (broken) S 1 4343",
            &status_body("broken", 4343, 1000, Some(4096), 2),
            "./broken\0",
        );

        fs
    }
}
