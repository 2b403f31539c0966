//! Diagnostics sink for export progress

use log::Level;
use std::cell::RefCell;

/// Receives human readable progress lines during an export
pub trait ExportLogger {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards every line to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLogger;

impl LogLogger {
    pub const TARGET: &'static str = "threecrate::export";
}

impl ExportLogger for LogLogger {
    fn info(&self, message: &str) {
        log::info!(target: Self::TARGET, "{}", message);
    }

    fn error(&self, message: &str) {
        log::error!(target: Self::TARGET, "{}", message);
    }

    fn debug(&self, message: &str) {
        log::debug!(target: Self::TARGET, "{}", message);
    }
}

/// Keeps every line in memory, in emission order
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: RefCell<Vec<(Level, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    /// Messages logged at `level`
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Whether any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|(_, m)| m.contains(needle))
    }

    fn record(&self, level: Level, message: &str) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }
}

impl ExportLogger for RecordingLogger {
    fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }

    fn debug(&self, message: &str) {
        self.record(Level::Debug, message);
    }
}
