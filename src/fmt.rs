//! Formatting helpers for the text output.
//!
//! Pure functions only. Unavailable values render as `"-"`.

/// Controls compact (table columns) vs verbose (summary lines) output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmtStyle {
    /// Compact: no spaces ("3m5s")
    Compact,
    /// Detail: spaces between units ("3m 5s")
    Detail,
}

/// Placeholder for a value the host could not provide.
pub const UNAVAILABLE: &str = "-";

/// Format seconds as `HH:MM:SS`.
///
/// Hours are not wrapped at 24, so `90061` renders as `"25:01:01"`.
pub fn format_hms(secs: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Format duration in seconds, keeping the two most significant units.
///
/// Compact: `"3m5s"`, `"2d4h"`
/// Detail:  `"3m 5s"`, `"2d 4h"`
pub fn format_duration(secs: u64, style: FmtStyle) -> String {
    let sep = match style {
        FmtStyle::Compact => "",
        FmtStyle::Detail => " ",
    };
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}{}s", secs / 60, sep, secs % 60)
    } else if secs < 86400 {
        format!("{}h{}{}m", secs / 3600, sep, (secs % 3600) / 60)
    } else {
        format!("{}d{}{}h", secs / 86400, sep, (secs % 86400) / 3600)
    }
}

/// `"54.5%"`, or `"-"` when unavailable.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => UNAVAILABLE.to_string(),
    }
}

/// Format a 0..=1 fraction as a percentage.
pub fn format_fraction(value: Option<f64>) -> String {
    format_percent(value.map(|f| f * 100.0))
}

/// Format gigabytes with 3 decimals (`"1.000G"`), or `"-"`.
pub fn format_gb(value: Option<f64>) -> String {
    match value {
        Some(gb) => format!("{:.3}G", gb),
        None => UNAVAILABLE.to_string(),
    }
}

/// `Display` for an optional value, `"-"` when absent.
pub fn format_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |v| v.to_string())
}

/// Command line for display: NUL separators become spaces.
pub fn format_command(cmdline: &str) -> String {
    cmdline.replace('\0', " ").trim_end().to_string()
}
