//! Error types for callmatch.

use thiserror::Error;

use crate::session::SessionId;

#[derive(Error, Debug)]
pub enum CallMatchError {
    // Configuration errors
    #[error("Invalid configuration value for {field}: {message}")]
    InvalidConfiguration { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Session errors
    #[error("Unknown session: {id}")]
    UnknownSession { id: SessionId },

    // Audio errors
    #[error("Invalid audio: {message}")]
    InvalidAudio { message: String },

    // Numeric failures that the epsilon guards should make unreachable;
    // surfaced instead of silently producing a bogus score.
    #[error("Internal computation error: {message}")]
    InternalComputation { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CallMatchError {
    /// Shorthand for an `InvalidConfiguration` error.
    pub fn config(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CallMatchError>;
