//! Error types for live sessions.

use genai_types::ContentError;
use thiserror::Error;

/// Result type for live session operations.
pub type Result<T> = std::result::Result<T, LiveError>;

/// Errors that can occur while connecting to or talking to a live session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiveError {
    /// Caller supplied malformed or ambiguous input. Raised before any I/O.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The transport could not be established or was rejected.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// An inbound frame could not be decoded as a known server message.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// A send was attempted after the session was closed.
    #[error("Session closed")]
    SessionClosed,

    /// The established transport failed.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Invalid client options or connect configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LiveError {
    /// Create a new validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a new connection error.
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a new protocol error.
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// Create a new transport error.
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::TransportError(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether this error was caused by caller input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }
}

impl From<serde_json::Error> for LiveError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<ContentError> for LiveError {
    fn from(err: ContentError) -> Self {
        Self::ValidationError(err.to_string())
    }
}
