//! Error types for CourseAdvisor.
//!
//! Library crates use [`AdvisorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Nothing below the orchestrator is allowed to panic on an external
//! failure: every boundary (embedding, completion, fetch, storage) returns
//! one of these variants and the orchestrator decides the fallback.

use std::path::PathBuf;

/// Top-level error type for all CourseAdvisor operations.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Catalog file loading or parsing error.
    #[error("catalog error: {message}")]
    Catalog { message: String },

    /// Network/HTTP error during a page fetch.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Embedding service error (transport, auth, or response shape).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Chat-completion service error (transport, auth, or response shape).
    #[error("completion error: {0}")]
    Completion(String),

    /// Interaction-log storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Semantic index artifact error (missing, corrupt, or misaligned).
    #[error("index error: {message}")]
    Index { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (artifact count mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AdvisorError>;

impl AdvisorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a catalog error from any displayable message.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create an index error from any displayable message.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index {
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
