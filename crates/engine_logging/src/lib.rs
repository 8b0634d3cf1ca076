#![deny(missing_docs)]
//! Shared logging utilities for the tubesweep workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every message is
//! prefixed with the scroll pass the current thread is working on, so a long
//! walk over a feed can be followed pass by pass in the log.

use std::cell::Cell;

thread_local! {
    /// Thread-local storage for the current scroll pass.
    static SCROLL_PASS: Cell<u64> = const { Cell::new(0) };
}

/// Sets the scroll pass for the current thread.
/// The walker calls this once at the start of every collection pass.
pub fn set_scroll_pass(pass: u64) {
    SCROLL_PASS.with(|v| v.set(pass));
}

/// Retrieves the scroll pass for the current thread.
/// Returns 0 before the first pass has started.
pub fn get_scroll_pass() -> u64 {
    SCROLL_PASS.with(|v| v.get())
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("[pass {}] {}", $crate::get_scroll_pass(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("[pass {}] {}", $crate::get_scroll_pass(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("[pass {}] {}", $crate::get_scroll_pass(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("[pass {}] {}", $crate::get_scroll_pass(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("[pass {}] {}", $crate::get_scroll_pass(), format_args!($($arg)*));
    }};
}

/// Returns true when trace logging is enabled, so callers can skip
/// fetching element markup that would only be logged at trace level.
pub fn trace_enabled() -> bool {
    log::log_enabled!(log::Level::Trace)
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
