use std::io::{self, BufReader};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{DapTransport, TransportWriter};

/// How long a read waits before reporting `WouldBlock` to the caller
const READ_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// TCP connection to a debug adapter
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_read_timeout(Some(READ_POLL_INTERVAL))?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Self::new(stream)
    }
}

impl DapTransport for TcpTransport {
    type Reader = BufReader<TcpStream>;
    type Writer = TcpStream;

    fn split(self) -> io::Result<(Self::Reader, Self::Writer)> {
        let input = self.stream.try_clone()?;
        Ok((BufReader::new(input), self.stream))
    }
}

impl TransportWriter for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        match TcpStream::shutdown(self, Shutdown::Both) {
            // the peer may already have gone away
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, Read, Write};
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn read_times_out_with_would_block() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = TcpTransport::connect(addr).unwrap();
        let (_server, _) = listener.accept().unwrap();

        let (mut reader, _writer) = transport.split().unwrap();
        let err = reader.fill_buf().unwrap_err();
        assert!(
            matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut),
            "got {err:?}"
        );
    }

    #[test]
    fn shutdown_is_seen_by_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = TcpTransport::connect(addr).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        let (_reader, mut writer) = transport.split().unwrap();
        writer.write_all(b"bye").unwrap();
        TransportWriter::shutdown(&mut writer).unwrap();
        TransportWriter::shutdown(&mut writer).unwrap();

        let mut received = Vec::new();
        server.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"bye");
    }
}
