//! Error types for the relay
//!
//! Only transport failures are fatal to a call. Codec errors drop the single
//! offending frame; guardrail and policy rejections are verdicts, not errors,
//! and never surface here.

use thiserror::Error;

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for call handling.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport errors
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Codec errors
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage errors
    #[error("storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}

/// Fatal socket failures on either peer. Triggers coordinated teardown of
/// the whole call.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Malformed audio payloads. Recoverable: the offending frame is dropped and
/// the pump continues.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty audio buffer")]
    Empty,

    #[error("PCM byte count {0} is not 16-bit aligned")]
    OddLength(usize),

    #[error("invalid base64 payload: {0}")]
    Base64(String),
}
