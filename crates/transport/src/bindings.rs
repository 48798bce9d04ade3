use std::io;
use std::net::TcpListener;

/// Ask the OS for a currently free local TCP port
///
/// The port is released before returning, so another process could take it;
/// callers that hand it to a debugger should be prepared for startup to fail.
pub fn get_random_tcp_port() -> io::Result<u16> {
    let mut last_error = None;
    for _ in 0..50 {
        match TcpListener::bind("127.0.0.1:0").and_then(|l| l.local_addr()) {
            Ok(addr) => return Ok(addr.port()),
            Err(e) => {
                tracing::warn!(%e, "binding");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| io::Error::other("could not get free port")))
}
