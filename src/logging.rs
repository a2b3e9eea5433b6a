//! Stderr logging backend for the `log` facade.
//!
//! Lines look like `[+0012ms] [DEBUG] [kernel_bench::surface] message`.
//! Debug output is enabled via `--verbose` or `KERNEL_BENCH_DEBUG=1`;
//! `KERNEL_BENCH_DEBUG=trace` adds per-trial and scope timing lines.
//! Otherwise only warnings and errors are printed.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Instant;

/// Environment variable that turns on debug output.
pub const DEBUG_ENV_VAR: &str = "KERNEL_BENCH_DEBUG";

static LOGGER: StderrLogger = StderrLogger;
static START: OnceLock<Instant> = OnceLock::new();

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(elapsed_ms(), record.level(), record.target(), &record.args().to_string());
        let _ = writeln!(io::stderr(), "{line}");
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Installs the stderr logger.
///
/// `verbose` (or a truthy `KERNEL_BENCH_DEBUG`) selects debug level and
/// `KERNEL_BENCH_DEBUG=trace` selects trace level; the default level shows warnings and errors only. Calling this twice is
/// harmless: the second call only adjusts the level.
pub fn init(verbose: bool) {
    START.get_or_init(Instant::now);
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level_for(verbose, std::env::var(DEBUG_ENV_VAR).ok().as_deref()));
}

fn level_for(verbose: bool, env_value: Option<&str>) -> LevelFilter {
    match env_value {
        Some("trace") => LevelFilter::Trace,
        Some("1" | "true" | "yes" | "debug") => LevelFilter::Debug,
        _ if verbose => LevelFilter::Debug,
        _ => LevelFilter::Warn,
    }
}

fn elapsed_ms() -> u128 {
    START.get().map_or(0, |start| start.elapsed().as_millis())
}

fn color_code(level: Level) -> &'static str {
    match level {
        Level::Trace => "\x1b[90m", // Gray
        Level::Debug => "\x1b[36m", // Cyan
        Level::Info => "\x1b[32m",  // Green
        Level::Warn => "\x1b[33m",  // Yellow
        Level::Error => "\x1b[31m", // Red
    }
}

fn format_line(elapsed_ms: u128, level: Level, target: &str, message: &str) -> String {
    format!(
        "[+{elapsed_ms:04}ms] {}[{:5}]\x1b[0m [{target}] {message}",
        color_code(level),
        level.as_str()
    )
}

/// RAII guard that logs entry and exit (with duration) of a scope at trace level.
pub struct TimingGuard {
    operation: String,
    start: Instant,
}

impl TimingGuard {
    /// Creates a new timing guard.
    pub fn new(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        log::trace!("-> {operation}");
        Self { operation, start: Instant::now() }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        log::trace!(
            "<- {} ({:.2}ms)",
            self.operation,
            self.start.elapsed().as_secs_f64() * 1000.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_selection() {
        assert_eq!(level_for(false, None), LevelFilter::Warn);
        assert_eq!(level_for(true, None), LevelFilter::Debug);
        assert_eq!(level_for(false, Some("1")), LevelFilter::Debug);
        assert_eq!(level_for(false, Some("0")), LevelFilter::Warn);
    }

    #[test]
    fn test_trace_level_reaches_timing_guard() {
        assert_eq!(level_for(false, Some("trace")), LevelFilter::Trace);
        assert_eq!(level_for(true, Some("trace")), LevelFilter::Trace);
        assert!(log::Level::Trace <= level_for(false, Some("trace")));
    }

    #[test]
    fn test_format_line_layout() {
        let line = format_line(12, Level::Info, "kernel_bench::surface", "grid ready");
        assert!(line.starts_with("[+0012ms]"), "{line}");
        assert!(line.contains("INFO"));
        assert!(line.contains("[kernel_bench::surface] grid ready"));
    }

    #[test]
    fn test_every_level_has_color() {
        for level in [Level::Trace, Level::Debug, Level::Info, Level::Warn, Level::Error] {
            assert!(color_code(level).starts_with("\x1b["));
        }
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init(false);
        init(true);
        log::debug!("logger installed");
    }

    #[test]
    fn test_timing_guard_drop() {
        init(false);
        let guard = TimingGuard::new("noop");
        assert_eq!(guard.operation, "noop");
        drop(guard);
    }
}
