use std::env;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

const LEVEL_VARIABLE: &str = "SIM_LOG";

/// Writes `log` records to stdout, warnings and errors to stderr.
struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        match record.level() {
            log::Level::Error | log::Level::Warn => {
                eprintln!("{:<5} {}", record.level(), record.args())
            }
            _ => println!("{:<5} {}", record.level(), record.args()),
        }
    }

    fn flush(&self) {}
}

/// Installs the console logger with the level named by `SIM_LOG`.
pub fn init() -> Result<(), SetLoggerError> {
    let level = env::var(LEVEL_VARIABLE)
        .ok()
        .and_then(|value| parse_level(&value))
        .unwrap_or(LevelFilter::Info);

    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}
