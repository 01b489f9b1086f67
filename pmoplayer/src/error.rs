//! Error types for the playback engine

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Why a playback attempt failed
///
/// The engine never returns these from `play()`: they reach the caller as
/// the payload of [`PlayerEvent::Error`](crate::PlayerEvent::Error).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayerError {
    /// The station has no usable stream URL
    #[error("Invalid station: {0}")]
    InvalidStation(String),

    /// The stream could not be reached or the connection dropped
    #[error("Stream unreachable: {0}")]
    StreamConnectionFailed(String),

    /// The stream was reached but its content could not be decoded
    #[error("Stream could not be decoded: {0}")]
    StreamDecodeFailed(String),

    /// The audio backend itself failed (device, resources)
    #[error("Audio backend error: {0}")]
    Backend(String),
}

impl PlayerError {
    /// Connection failure with the message reported by the decoder, if any
    pub fn connection_failed(message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Network error".to_string());
        Self::StreamConnectionFailed(message)
    }

    /// Create a backend error from a string
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
