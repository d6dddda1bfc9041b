//! Error types for playback coordination
//!
//! Runtime operations (next-track lookup, sync, shim calls) never return
//! these to the UI; they are logged and absorbed at the boundary. Errors
//! surface from configuration loading and from transport internals.

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Sync channel failure (closed, not attached, lagging)
    #[error("Sync channel error: {0}")]
    Sync(String),

    /// Media element refused an operation
    #[error("Media element error: {0}")]
    Media(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sync payload could not be encoded or decoded
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl PlaybackError {
    /// Create a sync error
    pub fn sync(msg: impl Into<String>) -> Self {
        Self::Sync(msg.into())
    }

    /// Create a media error
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }
}

impl From<config::ConfigError> for PlaybackError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
