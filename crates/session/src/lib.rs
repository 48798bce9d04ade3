//! The debug-session protocol engine
//!
//! A [`Session`] owns the connection to one debug adapter (and optionally the
//! adapter's process). Every operation is a single blocking call: the request
//! is sent, then the same thread reads messages until the answer arrives,
//! classifying each one as the awaited response, a leftover response, or an
//! event. There is no background reader.
//!
//! Callers sharing a session across threads must serialize access themselves.
mod correlator;
mod error;
mod sequencer;
mod session;
mod state;

pub use correlator::Completion;
pub use error::SessionError;
pub use session::{
    ExecutionOutcome, RECENT_EVENTS, RequestOutcome, Session, StartOptions, StopInfo, StopOutcome,
};
pub use state::{Operation, SessionState};

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
