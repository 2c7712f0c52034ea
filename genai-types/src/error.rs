//! Error types for content handling.

use thiserror::Error;

/// Errors raised while normalizing caller-supplied content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// A bare part list contained a function call or function response part.
    #[error(
        "part {index} is a function call or function response; wrap such parts in a Content with an explicit role"
    )]
    UnwrappedFunctionPart {
        /// Position of the offending part.
        index: usize,
    },

    /// Normalizer-specific failure.
    #[error("invalid content: {0}")]
    Invalid(String),
}

impl ContentError {
    /// Create a new invalid-content error.
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::Invalid(msg.into())
    }
}
