use std::io::{self, Write};

use chrono::Local;
use log::{set_logger, set_max_level, Level, LevelFilter, Log, Metadata, Record};

static LOGGER: Logger = Logger;

/// Installs the [`Logger`] as the global logger. Calling this function more than once has no
/// effect besides updating the level.
pub fn init(level: LevelFilter) {
    if set_logger(&LOGGER).is_err() {
        log::debug!("Logger is already initialized");
    }

    set_max_level(level);
}

/// Writes all records to stdout as `[time] [file:line] [LEVEL] message`.
#[derive(Copy, Clone, Debug)]
pub struct Logger;

impl Logger {
    fn format(record: &Record) -> String {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");

        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };

        format!(
            "[{}] [{}:{}] [{}] {}",
            now,
            record.file().unwrap_or("???"),
            record.line().unwrap_or(0),
            level,
            record.args()
        )
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = Self::format(record);

        // Nothing sensible to do if stdout is gone.
        let _ = writeln!(io::stdout().lock(), "{}", line);
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}
