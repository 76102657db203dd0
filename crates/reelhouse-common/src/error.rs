//! Common error types used throughout reelhouse.
//!
//! This module provides a unified error type that covers common failure cases
//! such as missing catalog rows, unplayable items, database errors, encoder
//! failures and I/O failures.

/// Common error type for reelhouse.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested item or file was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A bounded resource (encoder slot, connection) is exhausted.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Both compatibility attempts failed for a playback request.
    #[error("Transcode failed: {0}")]
    Transcode(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Unavailable error.
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a new Transcode error.
    pub fn transcode<S: Into<String>>(msg: S) -> Self {
        Self::Transcode(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code this error maps to at the API boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidInput(_) => 400,
            Self::Unavailable(_) => 503,
            Self::Database(_) | Self::Io(_) | Self::Transcode(_) | Self::Internal(_) => 500,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
