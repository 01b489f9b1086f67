//! Error types for the Radio Browser directory client

/// Result type alias for directory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when querying the Radio Browser directory
///
/// Only [`Error::DirectoryUnreachable`] and [`Error::SearchFailed`] escape the
/// mirror loops; the other variants describe why a single mirror was skipped
/// and end up as the message of those two.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Mirror answered with a 5xx status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Mirror answered with a well-formed body of the wrong shape
    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),

    /// Caller supplied an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Every mirror failed and no cached data exists for the query
    #[error("Radio database unreachable: {0}")]
    DirectoryUnreachable(String),

    /// Every search mirror failed
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// Configuration error (from pmoconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an unexpected payload error
    pub fn unexpected_payload(msg: impl Into<String>) -> Self {
        Self::UnexpectedPayload(msg.into())
    }
}
