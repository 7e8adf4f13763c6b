// Error types for registry lookups, request handling and execution scopes.

use stepkit_sdk::{IndexError, LifecycleLevel};
use thiserror::Error;

/// Lookup failures in the step registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no step implementation registered for '{step_value}'")]
    NotFound { step_value: String },
}

/// Reasons a step execution is refused before user code is invoked.
///
/// The `Display` text of each variant is the exact error message reported
/// back in the execution result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Step Implementation not found")]
    StepNotFound,

    #[error("Argument length mismatch for {name}. Actual Count: {actual}, Expected Count: {expected}")]
    ArgumentMismatch {
        name: String,
        actual: usize,
        expected: usize,
    },

    #[error("Step implementation '{0}' was indexed but never loaded")]
    NotLoaded(String),
}

impl From<RegistryError> for ExecutionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { .. } => ExecutionError::StepNotFound,
        }
    }
}

/// Execution scope state violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("no execution scope is open")]
    NoOpenScope,

    #[error("{level} scope {id} is already closed")]
    AlreadyClosed { id: u64, level: LifecycleLevel },
}

/// A request that cannot be served. Fatal to that request only.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid file status: {0}")]
    InvalidFileStatus(i32),

    #[error("unsupported request: {0}")]
    Unsupported(&'static str),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
