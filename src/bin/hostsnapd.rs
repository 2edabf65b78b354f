//! hostsnapd - host telemetry polling daemon.
//!
//! Samples `/proc` once per interval and writes one record per cycle to
//! stdout, either as a text table or as a JSON line. Logs go to stderr.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::DateTime;
use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "linux")]
use hostsnap::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use hostsnap::collector::mock::MockFs;
use hostsnap::collector::{Collector, CollectorConfig, FileSystem, PollCycle};
use hostsnap::fmt::{
    FmtStyle, format_command, format_duration, format_fraction, format_gb, format_hms, format_opt,
    format_percent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable summary and process table.
    Text,
    /// One JSON object per line.
    Json,
}

/// Host telemetry polling daemon.
#[derive(Parser)]
#[command(name = "hostsnapd", about = "Host telemetry polling daemon", version)]
struct Args {
    /// Poll interval in seconds.
    #[arg(short, long, default_value = "1")]
    interval: u64,

    /// Stop after this many cycles.
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Path to /proc filesystem.
    #[arg(long, default_value = "/proc")]
    proc_path: PathBuf,

    /// Path to the os-release file.
    #[arg(long = "os-release", default_value = "/etc/os-release")]
    os_release: PathBuf,

    /// Path to the passwd file used for uid lookups.
    #[arg(long, default_value = "/etc/passwd")]
    passwd: PathBuf,

    /// Output format: text or json.
    #[arg(short, long, default_value = "text", value_parser = parse_format)]
    format: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Parses the `--format` value.
fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_ascii_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!("unknown format '{}', expected text or json", s)),
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["hostsnapd", "hostsnap"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Renders one cycle as a summary block followed by a process table.
fn render_text(cycle: &PollCycle) -> String {
    let sys = &cycle.system;
    let mut out = String::new();

    let when = DateTime::from_timestamp(cycle.timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| cycle.timestamp.to_string());
    out.push_str(&format!(
        "{}  {}  kernel {}  up {}\n",
        when,
        sys.os_name.as_deref().unwrap_or("-"),
        sys.kernel_version.as_deref().unwrap_or("-"),
        sys.up_time_secs
            .map(|s| format_duration(s, FmtStyle::Detail))
            .unwrap_or_else(|| "-".to_string()),
    ));
    out.push_str(&format!(
        "cpu {} ({} cores)  mem {}  procs {}  running {}  threads {}\n",
        format_percent(sys.cpu_percent),
        format_opt(sys.core_count),
        format_fraction(sys.ram_used_fraction),
        format_opt(sys.total_processes),
        format_opt(sys.running_processes),
        format_opt(sys.total_threads),
    ));
    if !sys.core_percents.is_empty() {
        let cores: Vec<String> = sys
            .core_percents
            .iter()
            .map(|c| format!("{} {}", c.id, format_percent(c.percent)))
            .collect();
        out.push_str(&cores.join("  "));
        out.push('\n');
    }

    out.push_str(&format!(
        "{:>7} {:<12} {:>9} {:>7} {:>9} {:>4}  {}\n",
        "PID", "USER", "VMEM", "CPU", "UPTIME", "THR", "COMMAND"
    ));
    for p in &cycle.processes {
        out.push_str(&format!(
            "{:>7} {:<12} {:>9} {:>7} {:>9} {:>4}  {}\n",
            p.pid,
            p.user,
            format_gb(p.virtual_memory_gb),
            format_percent(p.cpu_percent),
            p.up_time_secs
                .map(|s| format_hms(s as u64))
                .unwrap_or_else(|| "-".to_string()),
            format_opt(p.threads),
            format_command(&p.command),
        ));
    }
    out
}

fn render(cycle: &PollCycle, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(cycle)),
        OutputFormat::Json => {
            let mut line = serde_json::to_string(cycle)?;
            line.push('\n');
            Ok(line)
        }
    }
}

/// Runs the poll loop. Returns the process exit code.
fn run<F: FileSystem + Clone>(mut collector: Collector<F>, args: &Args) -> i32 {
    let interval = Duration::from_secs(args.interval);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut stdout = io::stdout().lock();
    let mut cycles: u64 = 0;
    let mut failures: u64 = 0;

    while running.load(Ordering::SeqCst) {
        match collector.collect_cycle() {
            Ok(cycle) => {
                if let Some(timing) = collector.last_timing() {
                    debug!(
                        "Cycle: {} processes in {:?} (enumerate {:?}, system {:?}, processes {:?})",
                        cycle.processes.len(),
                        timing.total,
                        timing.enumerate,
                        timing.system,
                        timing.processes
                    );
                }
                let written = render(&cycle, args.format)
                    .map_err(io::Error::other)
                    .and_then(|s| {
                        stdout.write_all(s.as_bytes())?;
                        stdout.flush()
                    });
                if let Err(e) = written {
                    // Reader went away (e.g. closed pipe); nothing left to do
                    error!("Failed to write cycle: {}", e);
                    return 1;
                }
            }
            Err(e) => {
                failures += 1;
                error!("Poll cycle failed: {}", e);
            }
        }

        cycles += 1;
        if args.count.is_some_and(|n| cycles >= n) {
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutdown after {} cycles ({} failed)", cycles, failures);
    if args.count.is_some() && failures > 0 {
        1
    } else {
        0
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("hostsnapd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, proc={}, os-release={}, passwd={}",
        args.interval,
        args.proc_path.display(),
        args.os_release.display(),
        args.passwd.display()
    );

    let config = CollectorConfig {
        proc_path: args.proc_path.clone(),
        os_release_path: args.os_release.clone(),
        passwd_path: args.passwd.clone(),
    };

    #[cfg(target_os = "linux")]
    let collector = Collector::new(RealFs::new(), config);
    #[cfg(not(target_os = "linux"))]
    let collector = {
        warn!("Not running on Linux, sampling a built-in mock host");
        Collector::new(MockFs::typical_system(), config)
    };
    info!("Clock ticks: {} Hz", collector.tick_rate().hz());

    let code = run(collector, &args);
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostsnap::collector::MockFs;
    use hostsnap::rates::TickRate;

    fn typical_cycle() -> PollCycle {
        Collector::new(MockFs::typical_system(), CollectorConfig::default())
            .with_tick_rate(TickRate::new(100))
            .collect_cycle()
            .unwrap()
    }

    #[test]
    fn render_text_lists_summary_and_processes() {
        let text = render_text(&typical_cycle());
        assert!(text.contains("Debian GNU/Linux 12 (bookworm)"));
        assert!(text.contains("kernel 6.1.0-18-amd64"));
        assert!(text.contains("up 3h 25m"));
        assert!(text.contains("cpu - (4 cores)"));
        assert!(text.contains("threads 11"));
        assert!(text.contains("cpu0 -"));
        assert!(text.contains("/sbin/init splash"));
        assert!(text.contains("postgres"));
        assert!(text.contains("1.000G"));
    }

    #[test]
    fn render_json_is_one_line() {
        let line = render(&typical_cycle(), OutputFormat::Json).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert!(value["timestamp"].is_i64());
        assert!(value["system"]["cpu_percent"].is_null());
        assert_eq!(value["processes"].as_array().map(|a| a.len()), Some(4));
    }

    #[test]
    fn args_defaults() {
        let args = Args::parse_from(["hostsnapd"]);
        assert_eq!(args.interval, 1);
        assert_eq!(args.count, None);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.proc_path, PathBuf::from("/proc"));

        let args = Args::parse_from(["hostsnapd", "-n", "3", "--format", "json", "-vv"]);
        assert_eq!(args.count, Some(3));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn parse_format_values() {
        assert_eq!(parse_format("JSON"), Ok(OutputFormat::Json));
        assert_eq!(parse_format("text"), Ok(OutputFormat::Text));
        assert!(parse_format("yaml").is_err());
        assert!(Args::try_parse_from(["hostsnapd", "--format", "yaml"]).is_err());
    }
}
