//! A minimal `log` backend that writes every record to standard error.

use std::env;
use std::io::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Environment variable consulted by `SimpleLogger::init_from_env`.
pub const LOG_ENV_VAR: &str = "RUST_JVM_LOG";

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

static LOGGER: SimpleLogger = SimpleLogger;

pub struct SimpleLogger;

impl SimpleLogger {
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
    }

    /// Installs the logger with the level named by `RUST_JVM_LOG`, falling back to `warn` when the
    /// variable is unset or unparseable.
    pub fn init_from_env() -> Result<(), SetLoggerError> {
        let level = env::var(LOG_ENV_VAR).ok()
            .and_then(|value| parse_level(&value))
            .unwrap_or(DEFAULT_LOG_LEVEL);
        Self::init(level)
    }
}

pub fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

impl Log for SimpleLogger {

    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // a failed diagnostic write has nowhere better to go
            let _ = writeln!(&mut io::stderr(), "[{}] [{}] {}", record.target(), record.level(),
                             record.args());
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}
