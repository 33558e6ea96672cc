//! Engine error types

use thiserror::Error;

/// Errors produced by the discovery engine
///
/// Oracle failures never appear here: every oracle call site degrades to a
/// neutral default. A coverage shortfall after full escalation is also not an
/// error; it is reported through the reconciliation log.
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O error while reading input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pattern failed validation or compilation
    #[error("invalid pattern: {reason}")]
    InvalidPattern {
        /// Why the pattern was rejected
        reason: String,
    },

    /// Boundary-mode input failed up-front validation
    #[error("invalid boundary input: {reason}")]
    InvalidBoundary {
        /// Which validation rule failed, and for which boundary
        reason: String,
    },

    /// Input bytes were not valid UTF-8
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Cache record could not be serialized or deserialized
    #[error("cache error: {0}")]
    Cache(#[from] serde_json::Error),
}

impl From<std::string::FromUtf8Error> for CoreError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        CoreError::Encoding(err.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, CoreError>;
