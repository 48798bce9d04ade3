//! DAP wire layer
//!
//! This crate contains the framing codec for the Debug Adapter Protocol, the
//! typed request/response/event payloads the bridge exchanges with a debug
//! adapter, and a blocking [`Connection`] built on top of them.
//!
//! Request/response correlation and lifecycle handling live in the `session`
//! crate; this crate only moves single messages on and off the wire.
pub mod bindings;
pub mod codec;
mod connection;
mod error;
pub mod events;
pub mod io;
mod message;
pub mod requests;
pub mod responses;
pub mod types;

pub use codec::{FrameReader, PollResult, encode};
pub use connection::Connection;
pub use error::{CodecError, TransportError};
pub use io::{DapTransport, InMemoryTransport, TcpTransport, TransportWriter};
pub use message::{IncomingRequest, Message, OutgoingMessage};
