//! Error type shared by every preprocessing stage.

use thiserror::Error;

/// Errors reported by the preprocessing functions.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// An argument or configuration value is out of its accepted domain
    /// (unknown enum string, non-positive `maxlen`, bad axis, ...).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A sequence token could not be coerced into the requested integer type.
    #[error("Invalid sequence element at row {row}, column {column}: {reason}")]
    InvalidSequenceElement {
        row: usize,
        column: usize,
        reason: String,
    },

    /// The tokenizer lacks the state the call needs.
    #[error("Tokenizer not fitted: {0}")]
    NotFitted(String),

    /// Image I/O or decoding failed.
    #[error("Image error: {0}")]
    Image(String),

    /// Failure reported by the `tokenizers` crate.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The capability was compiled out.
    #[error("{0} feature not enabled; compile with --features {0}")]
    FeatureDisabled(&'static str),
}

impl PreprocessError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PreprocessError::InvalidConfiguration(msg.into())
    }
}

/// Result type for preprocessing operations
pub type Result<T> = std::result::Result<T, PreprocessError>;
