//! The `error` module defines the error types used within `sockprobe`.
//!
//! `SessionError` is the only error a caller of the session API ever sees.
//! The lower layers (transports, the STOMP codec, header document parsing)
//! each have their own enum, converted into `SessionError` at the session
//! boundary.

use thiserror::Error;

/// Errors returned by [`crate::session::Session`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed caller-supplied structured input. Nothing was sent and the
    /// session state did not change.
    #[error("invalid configuration: {0}")]
    Config(#[from] HeaderError),

    /// The transport could not be opened.
    #[error("connection failed: {0}")]
    Connection(#[source] TransportError),

    /// The operation is not valid in the current session state.
    #[error("{0}")]
    State(String),

    /// A required argument is missing or empty.
    #[error("{0}")]
    Validation(String),

    /// The transport refused an outbound payload.
    #[error("send failed: {0}")]
    Send(#[source] TransportError),

    /// An outbound frame could not be serialized.
    #[error(transparent)]
    Encode(#[from] CodecError),
}

/// Errors reported by a [`crate::transport::Transport`] implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no tokio runtime available to drive the socket")]
    NoRuntime,

    #[error("socket is not open")]
    NotOpen,
}

/// STOMP frame encode/decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("cannot encode frame: {0}")]
    Encode(String),

    #[error("cannot decode frame: {0}")]
    Decode(String),
}

/// Rejections produced while parsing a caller-supplied header document.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("header document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("header document must be a JSON object")]
    NotAnObject,

    #[error("header {key:?} must be a string, number or boolean")]
    UnsupportedValue { key: String },

    #[error("header {key:?} is not allowed: {reason}")]
    Invalid { key: String, reason: &'static str },
}
