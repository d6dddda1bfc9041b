/// Core error types for Duet Player
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for Duet Player
#[derive(Error, Debug)]
pub enum CoreError {
    /// A value could not be parsed from its textual form
    #[error("Invalid {kind}: {value}")]
    Parse {
        /// What was being parsed
        kind: &'static str,
        /// The rejected text
        value: String,
    },

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a parse error
    pub fn parse(kind: &'static str, value: impl Into<String>) -> Self {
        Self::Parse {
            kind,
            value: value.into(),
        }
    }
}
