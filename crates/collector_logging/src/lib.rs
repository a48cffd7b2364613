#![deny(missing_docs)]
//! Shared logging utilities for the collector workspace.
//!
//! This crate provides the `collect_*` logging macros used across the
//! codebase and a minimal test initializer for the global logger. Log lines
//! are prefixed with the source currently being crawled.

use std::cell::RefCell;

thread_local! {
    /// Thread-local storage for the name of the source being crawled.
    static RUN_SOURCE: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Sets the source label for the current thread.
/// The orchestrator calls this once at run start.
pub fn set_run_source(name: &str) {
    RUN_SOURCE.with(|v| *v.borrow_mut() = name.to_string());
}

/// Retrieves the source label for the current thread.
/// Returns "-" if no run is active.
pub fn run_source() -> String {
    RUN_SOURCE.with(|v| {
        let label = v.borrow();
        if label.is_empty() {
            "-".to_string()
        } else {
            label.clone()
        }
    })
}

/// Logs a trace-level message prefixed with the active source label.
#[macro_export]
macro_rules! collect_trace {
    ($($arg:tt)*) => {{
        log::trace!("[{}] {}", $crate::run_source(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message prefixed with the active source label.
#[macro_export]
macro_rules! collect_info {
    ($($arg:tt)*) => {{
        log::info!("[{}] {}", $crate::run_source(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message prefixed with the active source label.
#[macro_export]
macro_rules! collect_debug {
    ($($arg:tt)*) => {{
        log::debug!("[{}] {}", $crate::run_source(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message prefixed with the active source label.
#[macro_export]
macro_rules! collect_warn {
    ($($arg:tt)*) => {{
        log::warn!("[{}] {}", $crate::run_source(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message prefixed with the active source label.
#[macro_export]
macro_rules! collect_error {
    ($($arg:tt)*) => {{
        log::error!("[{}] {}", $crate::run_source(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
