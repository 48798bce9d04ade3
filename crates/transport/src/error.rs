//! Error types for the wire layer.

use std::io;

/// Errors produced while framing, encoding or decoding a single DAP message.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The outgoing message could not be represented as JSON.
    #[error("could not encode message: {0}")]
    Encoding(#[source] serde_json::Error),

    /// The frame was truncated, its headers were invalid or its body was not a
    /// DAP message.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The message body exceeds the configured maximum size.
    #[error("message size {size} exceeds maximum allowed {max}")]
    MessageTooLarge {
        /// The announced message size.
        size: usize,
        /// The maximum allowed size.
        max: usize,
    },

    /// The peer closed the stream on a message boundary.
    #[error("stream closed by peer")]
    StreamClosed,

    /// An I/O error occurred while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}

/// Errors produced by a [`crate::Connection`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The debug adapter address could not be reached.
    #[error("could not connect to {address}")]
    Connection {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The connection was already closed locally.
    #[error("connection is closed")]
    Closed,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
