//! Reporter trait for dependency injection
//!
//! The engine reports what it does through this trait instead of printing or
//! exiting. The host decides where messages go: a terminal, its own logger, or
//! nowhere.

use std::sync::{Arc, Mutex};

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Something failed: an artifact could not be deleted, the state could
    /// not be saved, or the pass had to stop.
    Error,
    /// Degraded but handled (addon disabled, source unreachable).
    Warning,
    /// Progress and decisions.
    Info,
    /// A completed install or removal.
    Success,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
        };
        f.write_str(s)
    }
}

/// Receives everything the engine has to say.
///
/// Only [`Reporter::log`] is required; the level helpers route through it.
pub trait Reporter: Send + Sync {
    /// Deliver one message.
    fn log(&self, level: LogLevel, msg: &str);

    /// Indicates a new phase has started (e.g. "Fetching catalog").
    fn section(&self, _title: &str) {}

    /// Log an informational message.
    fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    /// Log a success message.
    fn success(&self, msg: &str) {
        self.log(LogLevel::Success, msg);
    }

    /// Log a warning message.
    fn warning(&self, msg: &str) {
        self.log(LogLevel::Warning, msg);
    }

    /// Log an error message.
    fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }
}

impl<T: Reporter + ?Sized> Reporter for Arc<T> {
    fn log(&self, level: LogLevel, msg: &str) {
        (**self).log(level, msg);
    }
    fn section(&self, title: &str) {
        (**self).section(title);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn log(&self, _: LogLevel, _: &str) {}
}

/// Keeps every message in memory. Handy for hosts that show a summary later,
/// and for tests.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingReporter {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything logged so far, in order.
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Messages logged at `level`.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn log(&self, level: LogLevel, msg: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, msg.to_string()));
        }
    }
}
