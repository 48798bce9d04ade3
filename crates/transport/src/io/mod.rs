//! Byte transports a [`crate::Connection`] can run over
//!
//! ```
//! use transport::io::InMemoryTransport;
//! use transport::Connection;
//!
//! let (client, _adapter) = InMemoryTransport::pair();
//! let connection = Connection::with_transport(client)?;
//! assert!(connection.is_open());
//! # Ok::<(), transport::TransportError>(())
//! ```
use std::io::{self, BufRead, Write};

mod memory;
mod tcp;

pub use memory::{InMemoryReader, InMemoryTransport, InMemoryWriter};
pub use tcp::TcpTransport;

/// Bidirectional byte stream to a debug adapter
///
/// Readers must return `WouldBlock` (or `TimedOut`) when no data arrives
/// within their poll interval rather than blocking forever, so that callers
/// can enforce their own deadlines.
pub trait DapTransport: Send + 'static {
    type Reader: BufRead + Send + 'static;
    type Writer: TransportWriter;

    /// Split the transport into independent reader and writer halves
    fn split(self) -> io::Result<(Self::Reader, Self::Writer)>;
}

/// Writer half of a transport
pub trait TransportWriter: Write + Send + 'static {
    /// Close the stream in both directions
    ///
    /// After this returns the peer observes end-of-stream and the local reader
    /// stops receiving data. Calling it more than once is harmless.
    fn shutdown(&mut self) -> io::Result<()>;
}
