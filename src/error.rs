//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = WordwinError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during configuration, IO, or extraction.
#[derive(Debug, Error)]
pub enum WordwinError {
    /// Configuration or caller arguments failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// A chunk counting task failed; the whole extraction is aborted.
    #[error("worker failed on chunk {chunk} of {path:?}: {message}")]
    Worker {
        /// File the failing chunk belongs to.
        path: PathBuf,
        /// Zero-based chunk index within the file.
        chunk: usize,
        /// Rendered cause of the failure.
        message: String,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for WordwinError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl WordwinError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}
