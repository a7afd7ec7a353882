//! Leveled logger contract and the stock implementations.
//!
//! A [`Logger`] exposes one operation per severity plus an unleveled
//! `print`. Every operation receives pre-built [`fmt::Arguments`], so callers
//! keep using `format_args!` templates with positional arguments.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use parking_lot::Mutex;

use crate::error::LogError;

/// Minimum level used by [`StdLogger::stdout`].
pub const DEFAULT_LEVEL: Level = Level::Info;

/// Severity of a log line, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// All levels, most verbose first.
    pub const ALL: [Level; 5] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Match an exact bracket label such as `WARN`. Labels are case-sensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == label)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(&s.trim().to_uppercase()).ok_or_else(|| LogError::InvalidLevel(s.to_string()))
    }
}

/// Leveled logger contract consumed by the middleware.
///
/// Implementations must be shareable across threads. The middleware calls
/// them while holding its own dispatch lock; anything an implementation
/// writes back into the intercepted sink from inside a call is dropped.
pub trait Logger: Send + Sync {
    /// Unleveled output.
    fn print(&self, args: fmt::Arguments<'_>);
    fn debug(&self, args: fmt::Arguments<'_>);
    fn info(&self, args: fmt::Arguments<'_>);
    fn warn(&self, args: fmt::Arguments<'_>);
    fn error(&self, args: fmt::Arguments<'_>);
}

/// Logger writing `<prefix><LEVEL> <message>` lines to any writer.
pub struct StdLogger {
    out: Mutex<Box<dyn Write + Send>>,
    prefix: String,
    level: Level,
}

impl StdLogger {
    /// Create a logger over `out`. Messages below `level` are discarded;
    /// unleveled `print` output is always written.
    pub fn new(out: impl Write + Send + 'static, prefix: impl Into<String>, level: Level) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            prefix: prefix.into(),
            level,
        }
    }

    /// Logger over stdout at [`DEFAULT_LEVEL`] with no prefix.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), "", DEFAULT_LEVEL)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    fn emit(&self, level: Option<Level>, args: fmt::Arguments<'_>) {
        if matches!(level, Some(l) if l < self.level) {
            return;
        }
        let message = args.to_string();
        let message = message.trim_end_matches('\n');
        let mut out = self.out.lock();
        // Nowhere left to report a failing log writer.
        let _ = match level {
            Some(l) => writeln!(out, "{}{} {}", self.prefix, l, message),
            None => writeln!(out, "{}{}", self.prefix, message),
        };
        let _ = out.flush();
    }
}

impl Default for StdLogger {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for StdLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdLogger")
            .field("prefix", &self.prefix)
            .field("level", &self.level)
            .finish()
    }
}

impl Logger for StdLogger {
    fn print(&self, args: fmt::Arguments<'_>) {
        self.emit(None, args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Some(Level::Debug), args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Some(Level::Info), args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Some(Level::Warn), args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(Some(Level::Error), args);
    }
}

/// Logger forwarding every record to `tracing` under the `stratum::engine`
/// target. Unleveled output is reported at info.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn print(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: "stratum::engine", "{}", args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: "stratum::engine", "{}", args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: "stratum::engine", "{}", args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(target: "stratum::engine", "{}", args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: "stratum::engine", "{}", args);
    }
}
