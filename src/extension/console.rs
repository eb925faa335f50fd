//! User-facing output channel of a CLI extension.
//!
//! Logging goes to the log file through `tracing`; everything the user is
//! meant to read goes through an [`ExtensionConsole`].

use std::io::Write;
use std::sync::Mutex;

/// Severity of one console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Info,
    Warn,
    Error,
}

/// Output sink handed to extension handlers.
pub trait ExtensionConsole: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Writes info to stdout and warnings/errors to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdConsole;

impl ExtensionConsole for StdConsole {
    fn info(&self, message: &str) {
        let _ = writeln!(std::io::stdout().lock(), "{message}");
    }

    fn warn(&self, message: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{message}");
    }

    fn error(&self, message: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{message}");
    }
}

/// Console that records every line in memory.
#[derive(Debug, Default)]
pub struct BufferConsole {
    lines: Mutex<Vec<(ConsoleLevel, String)>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines written so far, in order.
    pub fn lines(&self) -> Vec<(ConsoleLevel, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Text of the lines written at `level`.
    pub fn lines_at(&self, level: ConsoleLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, text)| text)
            .collect()
    }

    fn push(&self, level: ConsoleLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}

impl ExtensionConsole for BufferConsole {
    fn info(&self, message: &str) {
        self.push(ConsoleLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(ConsoleLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(ConsoleLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_console_records_in_order() {
        let console = BufferConsole::new();
        console.info("one");
        console.error("two");
        console.warn("three");

        assert_eq!(
            console.lines(),
            vec![
                (ConsoleLevel::Info, "one".to_string()),
                (ConsoleLevel::Error, "two".to_string()),
                (ConsoleLevel::Warn, "three".to_string()),
            ]
        );
        assert_eq!(console.lines_at(ConsoleLevel::Error), vec!["two"]);
    }
}
