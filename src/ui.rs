//! Console output helpers

use colored::{ColoredString, Colorize};
use std::time::Duration;

/// Severity of a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn tag(self) -> ColoredString {
        match self {
            Level::Info => "[INFO]".green(),
            Level::Warn => "[WARN]".yellow(),
            Level::Error => "[ERROR]".red().bold(),
            Level::Debug => "[DEBUG]".dimmed(),
        }
    }
}

/// Print a tagged line to stderr
pub fn print(level: Level, message: &str) {
    eprintln!("{} {}", level.tag(), message);
}

/// Highlight a task name
pub fn task(name: &str) -> ColoredString {
    format!("'{}'", name).cyan()
}

/// Human-friendly duration (`42 ms`, `1.25 s`)
pub fn elapsed(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{} ms", millis)
    } else {
        format!("{:.2} s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_formatting() {
        assert_eq!(elapsed(Duration::from_millis(42)), "42 ms");
        assert_eq!(elapsed(Duration::from_millis(1250)), "1.25 s");
    }
}
