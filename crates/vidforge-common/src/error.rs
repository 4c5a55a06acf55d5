//! Common error types used throughout vidforge.

/// Common error type for vidforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client-supplied input was refused.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
