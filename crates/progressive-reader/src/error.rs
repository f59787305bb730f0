use std::path::PathBuf;
use thiserror::Error;

/// Result type for reader operations
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors surfaced by the progressive reader.
///
/// Only opening a document, seeking and token/cache handling can fail.
/// Scanning and chunking never fail; malformed source degrades the boundary
/// table instead (see [`crate::ScanDiagnostics`]).
#[derive(Error, Debug)]
pub enum ReaderError {
    /// Input path does not resolve
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Document bytes could not be read or decoded as text
    #[error("Failed to read {path}: {reason}")]
    ReadError { path: String, reason: String },

    /// Seek target lies beyond the document
    #[error("Line {line} is out of range (document has {total_lines} lines)")]
    OutOfRange { line: usize, total_lines: usize },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Continuation token could not be decoded or does not fit the session
    #[error("Invalid continuation token: {0}")]
    InvalidToken(String),

    /// Document changed since the continuation token was issued
    #[error("Document has been modified since the continuation token was created")]
    StaleToken,

    /// Boundary cache entry could not be (de)serialized
    #[error("Boundary cache error: {0}")]
    Cache(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReaderError {
    /// Create a read error for a document
    pub fn read(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::ReadError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid token error
    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    /// Create a cache error
    pub fn cache(msg: impl ToString) -> Self {
        Self::Cache(msg.to_string())
    }

    /// Whether the caller can retry with different arguments on the same session
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }
}
