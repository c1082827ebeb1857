//! Injectable logging capability.
//!
//! Every component that can recover from a failure reports it through a
//! [`Logger`] handed to it by the caller. Binaries use [`LogLogger`], which
//! forwards to the `log` facade; tests use [`MemoryLogger`] to assert on what
//! was reported.

use std::sync::{Mutex, MutexGuard};

/// Sink for diagnostics produced by the rendering pipeline.
pub trait Logger: Send + Sync {
    /// Report a failure that was recovered from but changed the output.
    fn error(&self, message: &str);

    /// Report suspicious input that was ignored or replaced by a default.
    fn warning(&self, message: &str);

    /// Report normal operational events.
    fn info(&self, message: &str);
}

/// Logger forwarding to the `log` crate under a fixed target.
#[derive(Debug, Clone)]
pub struct LogLogger {
    target: String,
}

impl LogLogger {
    /// Create a logger whose records carry `target` (usually the widget name).
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// The `log` target used for every record.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for LogLogger {
    fn default() -> Self {
        Self::new("waygauge")
    }
}

impl Logger for LogLogger {
    fn error(&self, message: &str) {
        log::error!(target: &self.target, "{message}");
    }

    fn warning(&self, message: &str) {
        log::warn!(target: &self.target, "{message}");
    }

    fn info(&self, message: &str) {
        log::info!(target: &self.target, "{message}");
    }
}

/// Severity of a captured record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Info,
}

/// A record captured by [`MemoryLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub message: String,
}

/// Logger that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<Record>>,
}

impl MemoryLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    /// Messages logged at `level`, oldest first.
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|record| record.level == level)
            .map(|record| record.message.clone())
            .collect()
    }

    /// Whether any record at `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lock()
            .iter()
            .any(|record| record.level == level && record.message.contains(needle))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn push(&self, level: Level, message: &str) {
        self.lock().push(Record {
            level,
            message: message.to_owned(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        // A poisoned buffer still holds valid records.
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Logger for MemoryLogger {
    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }

    fn warning(&self, message: &str) {
        self.push(Level::Warning, message);
    }

    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }
}

/// Install `env_logger` on stderr for a widget binary.
///
/// The default filter is `warn`, or `info` when `verbose` is set; `RUST_LOG`
/// takes precedence over both.
pub fn init(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    if let Err(e) = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .format_timestamp_millis()
    .target(env_logger::Target::Stderr)
    .try_init()
    {
        eprintln!("waygauge: logger already installed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_captures_levels() {
        let logger = MemoryLogger::new();
        logger.error("boom");
        logger.warning("careful");
        logger.info("hello");

        assert_eq!(logger.records().len(), 3);
        assert_eq!(logger.messages(Level::Error), vec!["boom".to_owned()]);
        assert!(logger.contains(Level::Warning, "care"));
        assert!(!logger.contains(Level::Info, "boom"));
    }

    #[test]
    fn test_log_logger_target() {
        assert_eq!(LogLogger::new("cpu").target(), "cpu");
        assert_eq!(LogLogger::default().target(), "waygauge");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init(false);
        init(true);
    }
}
