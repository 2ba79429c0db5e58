#![deny(missing_docs)]
//! Shared logging utilities for the walker workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line logged
//! through the macros is prefixed with the traversal cursor of the current
//! thread, so a failure report always names the page and row to resume from.

use std::cell::Cell;
use std::fmt;

thread_local! {
    /// Thread-local storage for the traversal cursor `(page, row)`.
    static CURSOR: Cell<Option<(u32, usize)>> = const { Cell::new(None) };
}

/// Records the traversal cursor for the current thread.
/// The orchestrator calls this whenever its checkpoint moves.
pub fn set_cursor(page: u32, row: usize) {
    CURSOR.with(|c| c.set(Some((page, row))));
}

/// Forgets the traversal cursor, e.g. once a run has finished.
pub fn clear_cursor() {
    CURSOR.with(|c| c.set(None));
}

/// Retrieves the traversal cursor for the current thread, if one was set.
pub fn current_cursor() -> Option<(u32, usize)> {
    CURSOR.with(|c| c.get())
}

/// Display prefix for log lines; empty when no cursor is set.
#[derive(Debug, Clone, Copy)]
pub struct CursorTag(Option<(u32, usize)>);

impl fmt::Display for CursorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some((page, row)) => write!(f, "[page {page} row {row}] "),
            None => Ok(()),
        }
    }
}

/// Returns the prefix the `engine_*` macros put in front of every message.
pub fn cursor_tag() -> CursorTag {
    CursorTag(current_cursor())
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::cursor_tag(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::cursor_tag(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::cursor_tag(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::cursor_tag(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::cursor_tag(), format_args!($($arg)*));
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
