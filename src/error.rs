//! Error types for render-stream.

use thiserror::Error;

/// Main error type for all render-stream operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the underlying socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// JSON error while reading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (malformed header, wrong payload length, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A read ran past the bytes written into a buffer.
    #[error("Unexpected end of buffer: needed {needed} bytes, {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// A decoded string was not valid UTF-8.
    #[error("Invalid UTF-8 in string payload")]
    InvalidUtf8,

    /// The connection dropped while a call was waiting for its response.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A call was attempted while no session is established.
    #[error("Not connected")]
    NotConnected,

    /// The socket could not be opened and the retry budget is spent.
    #[error("Could not connect to {address}")]
    ConnectionFailed { address: String },

    /// Local and remote protocol versions are incompatible.
    #[error("Incompatible remote: {0}")]
    Compatibility(String),

    /// The remote accepted the socket but could not start streaming.
    #[error("Stream could not be started: {0}")]
    Stream(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
