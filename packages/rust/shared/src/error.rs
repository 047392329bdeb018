//! Error types for CreatorFlow.
//!
//! Library crates use [`CreatorFlowError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Stage-level failures are *not* expressed through this type: the
//! orchestrator captures them inside `StageResult`/ledger entries so that
//! a pipeline run always returns a run object. Only request validation
//! surfaces as an `Err` from the pipeline entry point.

use std::path::PathBuf;

/// Top-level error type for all CreatorFlow operations.
#[derive(Debug, thiserror::Error)]
pub enum CreatorFlowError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed request — rejected before any stage runs.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Generation provider error (transport, HTTP status, bad payload).
    #[error("provider error: {0}")]
    Provider(String),

    /// A stage exceeded its execution deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The run was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CreatorFlowError>;

impl CreatorFlowError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CreatorFlowError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = CreatorFlowError::validation("topic must not be empty");
        assert!(err.to_string().contains("topic must not be empty"));
    }
}
