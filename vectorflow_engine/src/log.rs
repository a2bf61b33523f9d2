//! Internal logging system for the Vectorflow engine
//!
//! - Pluggable sink through the [`Logger`] trait
//! - Five severity levels, ordered from Trace to Error
//! - Colored console output by default ([`DefaultLogger`])
//! - `file:line` attached to error entries by `engine_error!`
//!
//! The active logger is owned by [`crate::engine::Engine`].

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Sink for engine log entries
///
/// Implement this to redirect engine logs (file, test capture, host console...).
///
/// # Example
///
/// ```no_run
/// use vectorflow_engine::vectorflow::log::{Logger, LogEntry};
///
/// struct FrameTraceLogger;
///
/// impl Logger for FrameTraceLogger {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{}: {}", entry.source, entry.message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Handle one entry
    fn log(&self, entry: &LogEntry);
}

/// A single log record
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// When the entry was produced
    pub timestamp: SystemTime,

    /// Emitting module (e.g. "vectorflow::RenderContext")
    pub source: String,

    /// Formatted message
    pub message: String,

    /// Source file (error entries only)
    pub file: Option<&'static str>,

    /// Source line (error entries only)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Per-draw / per-upload detail
    Trace,
    /// Per-flush detail
    Debug,
    /// Lifecycle events
    Info,
    /// Recoverable problems (skipped assets, missing context)
    Warn,
    /// Failures, reported with file:line
    Error,
}

impl LogSeverity {
    /// Fixed-width colored label used by [`DefaultLogger`]
    fn label(self) -> ColoredString {
        match self {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        }
    }
}

/// Console logger
///
/// Format: `[YYYY-MM-DD HH:MM:SS.mmm] [SEVERITY] [source] message (file:line)`
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");
        let source = entry.source.bright_blue();

        match (entry.file, entry.line) {
            (Some(file), Some(line)) => println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, entry.severity.label(), source, entry.message, file, line
            ),
            _ => println!(
                "[{}] [{}] [{}] {}",
                timestamp, entry.severity.label(), source, entry.message
            ),
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::vectorflow::Engine::log(
            $crate::vectorflow::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::vectorflow::Engine::log(
            $crate::vectorflow::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::vectorflow::Engine::log(
            $crate::vectorflow::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::vectorflow::Engine::log(
            $crate::vectorflow::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::vectorflow::Engine::log_detailed(
            $crate::vectorflow::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an error and build the matching `Error::InvalidResource`
///
/// ```ignore
/// let ring = self.path_buffer.as_mut()
///     .ok_or_else(|| engine_err!("vectorflow::RenderContext", "path buffer is not allocated"))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::vectorflow::Error::InvalidResource(message)
    }};
}

/// Log an error and return it from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
