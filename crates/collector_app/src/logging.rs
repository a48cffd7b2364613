//! Logger setup for the collector binary.

use std::fs::File;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILE: &str = "collector.log";

/// Where log output goes, selected by the `--log` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// `collector.log` in the working directory.
    File,
    /// The terminal only.
    Terminal,
    /// Both terminal and file.
    Both,
}

/// Installs the global logger. A file destination that cannot be created is
/// reported on stderr and skipped rather than failing the run.
pub fn initialize(destination: LogDestination) {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(TermLogger::new(
            LevelFilter::Info,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        match File::create(LOG_FILE) {
            Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Info, config, file)),
            Err(err) => eprintln!("warning: could not create {LOG_FILE}: {err}"),
        }
    }
    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}
