use server::ServerError;
use transport::types::Seq;
use transport::{CodecError, TransportError};

use crate::state::{Operation, SessionState};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation needs an open connection to a debug adapter.
    #[error("debugger not started")]
    NotConnected,

    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        operation: Operation,
        state: SessionState,
    },

    /// Typed arguments are structurally unusable (e.g. an empty file path).
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The debugger process could not be started or stopped.
    #[error("debugger process error")]
    Server(#[source] ServerError),

    /// The debugger process never reported that it was listening.
    #[error("debugger did not become ready")]
    StartupTimeout(#[source] ServerError),

    #[error("could not connect to debugger")]
    Connection(#[source] TransportError),

    #[error("could not encode request")]
    Encoding(#[source] CodecError),

    /// The byte stream no longer contains valid frames.
    #[error("malformed message from debugger: {0}")]
    MalformedMessage(String),

    /// The peer closed the stream while a request was being written.
    #[error("debugger closed the connection")]
    StreamClosed(#[source] TransportError),

    /// A response answered a request that was never issued or already answered.
    #[error("received response to request {request_seq} while waiting for request {expected}")]
    ProtocolDesync { request_seq: Seq, expected: Seq },

    /// The debugger answered a well-formed request with a failure.
    #[error("{command} request failed: {message}")]
    RemoteOperation {
        command: String,
        message: String,
        /// Longer explanation from the response body, when the adapter sent one
        detail: Option<String>,
    },

    /// A successful response had a body that could not be decoded.
    #[error("invalid {command} response body")]
    InvalidResponseBody {
        command: String,
        #[source]
        source: CodecError,
    },

    /// The connection died, or stopped answering, while waiting for a reply.
    #[error("debug session lost: {0}")]
    SessionLost(String),
}

impl SessionError {
    /// Whether this error forced the session into
    /// [`SessionState::Terminated`]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::MalformedMessage(_)
                | SessionError::StreamClosed(_)
                | SessionError::ProtocolDesync { .. }
                | SessionError::SessionLost(_)
        )
    }
}
