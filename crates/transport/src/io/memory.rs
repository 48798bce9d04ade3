//! In-memory transport for tests and mock adapters
use std::io::{self, BufRead, Cursor, Read, Write};

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use super::{DapTransport, TransportWriter};

/// One end of an in-memory duplex pipe
///
/// Data written to one end of a [`InMemoryTransport::pair`] is read from the
/// other. Reading from an empty pipe returns `WouldBlock`, matching the TCP
/// read timeout; reading after the other end has gone returns end-of-stream.
pub struct InMemoryTransport {
    reader: InMemoryReader,
    writer: InMemoryWriter,
}

pub struct InMemoryReader {
    buffer: Cursor<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

pub struct InMemoryWriter {
    tx: Option<Sender<Vec<u8>>>,
}

impl InMemoryTransport {
    /// Create a connected `(client, adapter)` pair
    pub fn pair() -> (Self, Self) {
        let (client_tx, adapter_rx) = crossbeam_channel::unbounded();
        let (adapter_tx, client_rx) = crossbeam_channel::unbounded();

        let client = Self {
            reader: InMemoryReader::new(client_rx),
            writer: InMemoryWriter {
                tx: Some(client_tx),
            },
        };
        let adapter = Self {
            reader: InMemoryReader::new(adapter_rx),
            writer: InMemoryWriter {
                tx: Some(adapter_tx),
            },
        };
        (client, adapter)
    }
}

impl DapTransport for InMemoryTransport {
    type Reader = InMemoryReader;
    type Writer = InMemoryWriter;

    fn split(self) -> io::Result<(Self::Reader, Self::Writer)> {
        Ok((self.reader, self.writer))
    }
}

impl InMemoryReader {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            buffer: Cursor::new(Vec::new()),
            rx,
        }
    }
}

impl BufRead for InMemoryReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.buffer.position() >= self.buffer.get_ref().len() as u64 {
            match self.rx.try_recv() {
                Ok(data) => self.buffer = Cursor::new(data),
                Err(TryRecvError::Empty) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WouldBlock,
                        "no data available",
                    ));
                }
                Err(TryRecvError::Disconnected) => return Ok(&[]),
            }
        }
        self.buffer.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.buffer.consume(amt)
    }
}

impl Read for InMemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let len = available.len().min(buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        self.consume(len);
        Ok(len)
    }
}

impl Write for InMemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "writer shut down"))?;
        tx.send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel disconnected"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TransportWriter for InMemoryWriter {
    fn shutdown(&mut self) -> io::Result<()> {
        self.tx.take();
        Ok(())
    }
}
