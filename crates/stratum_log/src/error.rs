//! Error types for the log module.

use thiserror::Error;

/// Result type alias for log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur while installing or configuring log plumbing.
///
/// Writes through the middleware never produce these; only lifecycle and
/// configuration calls do.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("A log middleware is already installed on this sink")]
    AlreadyInstalled,

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Tracing subscriber error: {0}")]
    Subscriber(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
