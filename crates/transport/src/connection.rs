use std::io::{BufRead, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Instant;

use retry::{delay::Exponential, retry};

use crate::codec::{self, FrameReader, PollResult};
use crate::io::{DapTransport, TcpTransport, TransportWriter};
use crate::{Message, OutgoingMessage, TransportError};

/// A framed, blocking connection to a debug adapter
///
/// The connection does no correlation of its own: it writes whole messages
/// and hands back whatever arrives next, in arrival order.
///
/// ```no_run
/// use transport::Connection;
///
/// let connection = Connection::open("127.0.0.1:5678")?;
/// # Ok::<(), transport::TransportError>(())
/// ```
pub struct Connection {
    reader: FrameReader<Box<dyn BufRead + Send>>,
    writer: Option<Box<dyn TransportWriter>>,
}

impl Connection {
    /// Connect over TCP, retrying with exponential backoff
    /// (200ms, 400ms, 800ms, 1600ms, 3200ms) while the adapter comes up
    pub fn open<A>(addr: A) -> Result<Self, TransportError>
    where
        A: ToSocketAddrs + Clone + std::fmt::Debug,
    {
        let stream = retry(Exponential::from_millis(200).take(5), || {
            tracing::debug!(?addr, "trying to make connection");
            TcpStream::connect(addr.clone()).inspect_err(|e| {
                tracing::debug!(error = %e, "error making connection");
            })
        })
        .map_err(|e| TransportError::Connection {
            address: format!("{addr:?}"),
            source: e.error,
        })?;
        tracing::debug!(?addr, "connection made");

        Self::with_transport(TcpTransport::new(stream)?)
    }

    pub fn with_transport<T>(transport: T) -> Result<Self, TransportError>
    where
        T: DapTransport,
    {
        let (input, output) = transport.split()?;
        Ok(Self {
            reader: FrameReader::new(Box::new(input) as Box<dyn BufRead + Send>),
            writer: Some(Box::new(output)),
        })
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Write one complete framed message
    ///
    /// The frame is written with a single call so that a failure can never
    /// leave half a message on the wire followed by another message.
    pub fn send(&mut self, message: &OutgoingMessage) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::Closed)?;
        let bytes = codec::encode(message)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Block until the next message arrives
    pub fn receive_one(&mut self) -> Result<Message, TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        Ok(self.reader.poll_message()?)
    }

    /// Wait until `deadline` for the next message; `Ok(None)` on timeout
    pub fn receive_until(&mut self, deadline: Instant) -> Result<Option<Message>, TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        match self.reader.poll_until(deadline)? {
            PollResult::Message(message) => Ok(Some(message)),
            PollResult::Timeout => Ok(None),
        }
    }

    /// Close both directions of the stream; later calls do nothing
    pub fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(error) = writer.flush() {
                tracing::debug!(%error, "flushing connection before close");
            }
            if let Err(error) = writer.shutdown() {
                tracing::warn!(%error, "error shutting down connection");
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
