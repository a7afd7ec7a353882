//! Error types for the engine module.

use thiserror::Error;

use crate::diagnostics::Diagnostics;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur inside the engine or its collaborators.
#[derive(Error, Debug)]
pub enum EngineError {
    /// One or more error diagnostics, reduced to a single error.
    #[error("{0}")]
    Diagnostics(Diagnostics),

    #[error("Provider {name} failed to start: {message}")]
    ProviderInit { name: String, message: String },

    #[error("Provisioner {name} failed to start: {message}")]
    ProvisionerInit { name: String, message: String },

    #[error("Value error: {0}")]
    Value(#[from] ValueError),

    #[error("State file error: {0}")]
    StateFile(#[from] StateFileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Diagnostics> for EngineError {
    fn from(diags: Diagnostics) -> Self {
        EngineError::Diagnostics(diags)
    }
}

/// Errors raised while inferring or converting typed values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("cannot infer type: {0}")]
    Inference(String),

    #[error("cannot convert value: {0}")]
    Conversion(String),
}

/// Errors raised while encoding or decoding a state file.
#[derive(Error, Debug)]
pub enum StateFileError {
    #[error("malformed state file: {0}")]
    Malformed(String),

    #[error("unsupported state file format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("cannot encode state: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
