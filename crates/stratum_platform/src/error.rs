//! Error types for the platform layer.

use std::fmt;

use stratum_engine::{Diagnostics, StateFileError};
use thiserror::Error;

/// Result type alias for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Pipeline stage an engine error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Building the execution context from the loaded configuration.
    Context,
    Validate,
    Refresh,
    Plan,
    Apply,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Context => "context",
            Stage::Validate => "validate",
            Stage::Refresh => "refresh",
            Stage::Plan => "plan",
            Stage::Apply => "apply",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while driving the engine.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("no code to apply")]
    NoCode,

    #[error("failed to load the configuration. {0}")]
    ConfigLoad(Diagnostics),

    #[error("failed to bind variables: {0}")]
    Binding(String),

    #[error("variable {0:?} is not declared in the code")]
    UndeclaredVariable(String),

    #[error("{stage} failed: {diagnostics}")]
    Engine { stage: Stage, diagnostics: Diagnostics },

    #[error("State file error: {0}")]
    StateFormat(#[from] StateFileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl PlatformError {
    pub(crate) fn engine(stage: Stage, diagnostics: Diagnostics) -> Self {
        Self::Engine { stage, diagnostics }
    }

    /// Every diagnostic behind a load or engine failure.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::ConfigLoad(diagnostics) | Self::Engine { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Engine { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_engine::Diagnostic;

    #[test]
    fn test_engine_error_keeps_all_diagnostics() {
        let diagnostics: Diagnostics = vec![Diagnostic::error("first"), Diagnostic::error("second")]
            .into_iter()
            .collect();
        let err = PlatformError::engine(Stage::Plan, diagnostics);

        assert_eq!(err.stage(), Some(Stage::Plan));
        assert_eq!(err.diagnostics().map(Diagnostics::len), Some(2));
        assert!(err.to_string().starts_with("plan failed: "));
    }
}
