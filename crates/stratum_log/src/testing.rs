//! Recording logger for tests.
//!
//! Captures every call made through the [`Logger`] contract so tests can
//! assert on exactly which operation received which message.

use std::fmt;

use parking_lot::Mutex;

use crate::logger::Logger;

/// One captured logger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Print(String),
    Debug(String),
    Info(String),
    Warn(String),
    Error(String),
}

impl Call {
    pub fn message(&self) -> &str {
        match self {
            Call::Print(m) | Call::Debug(m) | Call::Info(m) | Call::Warn(m) | Call::Error(m) => m,
        }
    }
}

/// Logger that stores calls instead of printing them.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    calls: Mutex<Vec<Call>>,
}

impl RecordingLogger {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl Logger for RecordingLogger {
    fn print(&self, args: fmt::Arguments<'_>) {
        self.push(Call::Print(args.to_string()));
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        self.push(Call::Debug(args.to_string()));
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        self.push(Call::Info(args.to_string()));
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.push(Call::Warn(args.to_string()));
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        self.push(Call::Error(args.to_string()));
    }
}
