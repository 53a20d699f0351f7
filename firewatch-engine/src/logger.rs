//! Leveled logging behind a trait so service output can be asserted in tests.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Verbosity level for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Status transitions and summaries
    Normal,
    /// Rejections (-v)
    Verbose,
    /// Every appended verdict (-vv)
    Debug,
}

impl Verbosity {
    /// Map a repeated `-v` flag count to a level.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Verbosity::Normal => "info",
            Verbosity::Verbose => "verbose",
            Verbosity::Debug => "debug",
        }
    }
}

/// Sink for service log lines. Shared across submission threads.
pub trait Logger: Send + Sync {
    fn log(&self, level: Verbosity, message: &str);

    fn info(&self, message: &str) {
        self.log(Verbosity::Normal, message);
    }

    fn verbose(&self, message: &str) {
        self.log(Verbosity::Verbose, message);
    }

    fn debug(&self, message: &str) {
        self.log(Verbosity::Debug, message);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: Verbosity, message: &str) {
        (**self).log(level, message);
    }
}

/// Writes lines at or below its level to stderr.
#[derive(Debug)]
pub struct StderrLogger {
    level: Verbosity,
}

impl StderrLogger {
    pub fn new(level: Verbosity) -> Self {
        Self { level }
    }

    pub fn level(&self) -> Verbosity {
        self.level
    }
}

impl Logger for StderrLogger {
    fn log(&self, level: Verbosity, message: &str) {
        if level <= self.level {
            let _ = writeln!(std::io::stderr(), "[{}] {}", level.tag(), message);
        }
    }
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Verbosity,
    pub message: String,
}

/// Captures every entry regardless of level. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn messages_at_level(&self, level: Verbosity) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Whether any captured message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(needle))
    }

    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Verbosity, message: &str) {
        self.entries.lock().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Verbosity, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering() {
        assert!(Verbosity::Normal < Verbosity::Verbose);
        assert!(Verbosity::Verbose < Verbosity::Debug);
    }

    #[test]
    fn test_verbosity_from_count() {
        assert_eq!(Verbosity::from_count(0), Verbosity::Normal);
        assert_eq!(Verbosity::from_count(1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_count(2), Verbosity::Debug);
        assert_eq!(Verbosity::from_count(9), Verbosity::Debug);
    }

    #[test]
    fn test_mock_logger_captures_levels() {
        let logger = MockLogger::new();
        logger.info("status changed");
        logger.verbose("blocked");
        logger.debug("appended");

        let entries = logger.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].level, Verbosity::Normal);
        assert_eq!(entries[1].level, Verbosity::Verbose);
        assert_eq!(entries[2].level, Verbosity::Debug);
        assert_eq!(logger.messages_at_level(Verbosity::Verbose), vec!["blocked"]);
    }

    #[test]
    fn test_mock_logger_clone_shares_buffer() {
        let logger = MockLogger::new();
        let other = logger.clone();
        other.info("from clone");
        assert_eq!(logger.count(), 1);
        assert!(logger.contains("clone"));
    }

    #[test]
    fn test_arc_logger_forwards() {
        let inner = MockLogger::new();
        let shared: Arc<dyn Logger> = Arc::new(inner.clone());
        shared.verbose("via arc");
        assert_eq!(inner.messages_at_level(Verbosity::Verbose), vec!["via arc"]);
    }

    #[test]
    fn test_stderr_logger_level() {
        let logger = StderrLogger::new(Verbosity::from_count(1));
        assert_eq!(logger.level(), Verbosity::Verbose);
        logger.debug("filtered out");
    }

    #[test]
    fn test_null_logger_discards() {
        NullLogger.info("gone");
    }
}
