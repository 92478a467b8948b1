//! Log output for the `payroll` binary: stderr and an optional append-only file.

use anyhow::{Context, Result};
use chrono::Local;
use std::{
    fs::{File, OpenOptions},
    io::{self, IsTerminal},
    path::Path,
    sync::Arc,
};
use tracing_subscriber::{
    EnvFilter,
    fmt::{format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// How the binary should log, taken from the global flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOptions<'a> {
    /// Level or RUST_LOG-style directive; overrides the environment.
    pub level: Option<&'a str>,
    /// File that receives a copy of every event.
    pub file: Option<&'a Path>,
    /// Suppress the stderr output.
    pub quiet: bool,
}

struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Installs the global subscriber. Call once, after argument parsing.
pub fn init(options: &LogOptions<'_>) -> Result<()> {
    let filter = make_filter(options.level)?;

    let stderr = (!options.quiet).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(LocalTime)
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
    });

    let file = match options.file {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(open_log_file(path)?))
                .with_ansi(false)
                .with_timer(LocalTime)
                .with_target(false)
                .with_file(true)
                .with_line_number(true),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()
        .context("Failed to install log subscriber")
}

/// Explicit level first, then `RUST_LOG`, then `info`.
fn make_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("Invalid log filter: {level}"))
        }
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn explicit_level_wins() {
        let filter = make_filter(Some("debug")).unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn directives_pass_through() {
        let filter = make_filter(Some("payroll_core=trace,sqlx=warn")).unwrap();
        let text = filter.to_string();
        assert!(text.contains("payroll_core=trace"), "{text}");
        assert!(text.contains("sqlx=warn"), "{text}");
    }

    #[test]
    fn bad_level_is_reported() {
        let err = make_filter(Some("payroll=loud")).unwrap_err();
        assert!(err.to_string().contains("payroll=loud"));
    }

    #[test]
    fn log_file_and_parent_are_created() {
        let dir = std::env::temp_dir().join(format!("payroll-logs-{}", std::process::id()));
        let path = dir.join("nested").join("payroll.log");
        let _ = std::fs::remove_dir_all(&dir);

        open_log_file(&path).unwrap();

        assert!(path.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
