//! A small `log` sink writing `"{unix_secs} LEVEL target message"` lines to
//! a file or to stderr.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

use crate::argument_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl FromStr for LogLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            "off" | "none" => Ok(LogLevel::Off),
            _ => argument_error!(format!("unknown log level `{s}`")),
        }
    }
}

enum Sink {
    File(BufWriter<File>),
    Stderr,
}

struct Logger {
    level: LevelFilter,
    sink: Mutex<Sink>,
}

fn format_line(record: &Record<'_>) -> String {
    // clock before the epoch logs as 0
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!(
        "{now} {} {} {}",
        record.level(),
        record.target(),
        record.args()
    )
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(record);
        match &mut *self.sink.lock() {
            Sink::File(f) => {
                let _ = writeln!(f, "{line}");
            }
            Sink::Stderr => eprintln!("{line}"),
        }
    }

    fn flush(&self) {
        if let Sink::File(f) = &mut *self.sink.lock() {
            let _ = f.flush();
        }
    }
}

/// Installs the process-wide logger.
///
/// # Arguments
/// * `level` - The most verbose level written
/// * `log_file` - Lines are appended here; `None` writes to stderr
///
/// Only the first call installs a logger; later calls return `Ok(())`
/// without changing anything.
pub fn init(level: LogLevel, log_file: Option<&Path>) -> anyhow::Result<()> {
    let sink = match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Open log file {} for writing", path.display()))?;
            Sink::File(BufWriter::new(file))
        }
        None => Sink::Stderr,
    };

    let logger = Logger {
        level: level.filter(),
        sink: Mutex::new(sink),
    };

    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level.filter());
    }
    Ok(())
}

/// Flushes buffered lines; call before the process exits.
pub fn flush() {
    log::logger().flush();
}
