//! Error types for the tuning engine.
//!
//! Every failure in this crate is local and recoverable. Hosts receive typed
//! errors and decide whether to retry, ignore, or fall back to defaults; none
//! of them should ever stop the UI frame loop.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::benchmark::BenchmarkError;

/// Result type for tuning operations.
pub type TuningResult<T> = Result<T, TuningError>;

/// Errors surfaced by the tuning engine and its components.
#[derive(Debug, Error)]
pub enum TuningError {
    /// Optimizer, validator or engine configuration is outside sane bounds.
    ///
    /// Raised before any work is started.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Another run of the same operation is already in flight.
    #[error("{operation} is already running")]
    ConcurrentOperation { operation: &'static str },

    /// The operation observed its cancellation token and stopped.
    ///
    /// Partial progress has been discarded.
    #[error("{operation} was cancelled")]
    Cancelled { operation: &'static str },

    /// A benchmark pass could not complete.
    #[error("Benchmark failed: {0}")]
    BenchmarkFailure(#[from] BenchmarkError),

    /// Reading or writing persisted state failed.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl TuningError {
    /// Shorthand for an [`TuningError::InvalidConfiguration`] error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        TuningError::InvalidConfiguration(msg.into())
    }
}

/// Errors raised by key-value stores and the JSON layer on top of them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from a file-backed store.
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    /// Key contains characters the store cannot represent.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Stored payload could not be encoded or decoded.
    #[error("Serialization error for '{key}': {source}")]
    Serialization {
        key: String,
        source: serde_json::Error,
    },

    /// Payload decoded but failed validation.
    #[error("Malformed record '{key}': {reason}")]
    Malformed { key: String, reason: String },

    /// Record was written by an incompatible schema version.
    #[error("Unsupported schema version {found} for '{key}' (expected {expected})")]
    VersionMismatch {
        key: String,
        found: u32,
        expected: u32,
    },
}

/// Errors raised while loading an engine configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    /// The INI text could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A key had a value of the wrong type.
    #[error("Invalid value for [{section}] {key}: '{value}'")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    /// Values parsed but are out of range.
    #[error(transparent)]
    Invalid(#[from] TuningError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning_error_display() {
        let err = TuningError::invalid_config("max_iterations must be at least 1");
        assert!(err.to_string().contains("Invalid configuration"));
        assert!(err.to_string().contains("max_iterations"));

        let err = TuningError::ConcurrentOperation {
            operation: "optimization",
        };
        assert_eq!(err.to_string(), "optimization is already running");
    }

    #[test]
    fn test_store_error_converts_to_tuning_error() {
        let store_err = StoreError::InvalidKey("../escape".to_string());
        let err: TuningError = store_err.into();
        assert!(matches!(err, TuningError::Persistence(_)));
    }

    #[test]
    fn test_version_mismatch_display() {
        let err = StoreError::VersionMismatch {
            key: "learning_model".to_string(),
            found: 7,
            expected: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("learning_model"));
        assert!(msg.contains('7'));
    }
}
