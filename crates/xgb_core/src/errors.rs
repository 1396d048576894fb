//! Error types for the binding layer

use thiserror::Error;

/// Errors raised by handles, the learner and the dataset cache
#[derive(Error, Debug)]
pub enum XgbError {
    /// A binding entry point returned the failure sentinel
    #[error("native call {entry} failed: {message}")]
    NativeCall {
        entry: &'static str,
        message: String,
    },

    /// Ragged matrix, label count mismatch or empty input
    #[error("shape error: {0}")]
    Shape(String),

    /// Malformed row in a text dataset
    #[error("ingestion error at line {line}: {reason}")]
    Ingestion { line: u64, reason: String },

    /// API misuse such as predicting before training
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encoding or decoding failed
    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),
}

impl XgbError {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// True for failures reported by the native library itself
    pub fn is_native(&self) -> bool {
        matches!(self, Self::NativeCall { .. })
    }
}

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, XgbError>;
