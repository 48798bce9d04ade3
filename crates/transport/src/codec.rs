//! `Content-Length` framing for DAP messages
//!
//! Each message on the wire is a block of `Name: value\r\n` headers, a blank
//! `\r\n` line and then exactly `Content-Length` bytes of UTF-8 JSON.
use std::io::{self, BufRead};
use std::time::{Duration, Instant};

use crate::{CodecError, Message, OutgoingMessage};

/// Default maximum accepted body size (16 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

const CONTENT_LENGTH: &str = "Content-Length";

/// Back-off between reads when the transport has no data yet
const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Serialize and frame a message as a single byte buffer
pub fn encode(message: &OutgoingMessage) -> Result<Vec<u8>, CodecError> {
    let body = serde_json::to_vec(message).map_err(CodecError::Encoding)?;
    Ok(frame(&body))
}

/// Prefix an already serialized body with its `Content-Length` header
pub fn frame(body: &[u8]) -> Vec<u8> {
    let header = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len());
    let mut out = Vec::with_capacity(header.len() + body.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(body);
    out
}

/// Result of a deadline-aware read
#[derive(Debug)]
pub enum PollResult {
    /// A complete message was received
    Message(Message),
    /// The deadline passed before a complete message arrived. Any partially
    /// read frame is kept and resumed on the next call.
    Timeout,
}

enum ReaderState {
    Header,
    Content,
}

/// Incremental frame decoder over a buffered byte stream
///
/// The reader keeps partial frames across timeouts, so a deadline firing in
/// the middle of a message never loses bytes.
pub struct FrameReader<R> {
    input: R,
    max_size: usize,
    state: ReaderState,
    line: Vec<u8>,
    seen_header: bool,
    content_length: Option<usize>,
    body: Vec<u8>,
    filled: usize,
}

impl<R> FrameReader<R>
where
    R: BufRead,
{
    pub fn new(input: R) -> Self {
        Self::with_max_size(input, DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn with_max_size(input: R, max_size: usize) -> Self {
        Self {
            input,
            max_size,
            state: ReaderState::Header,
            line: Vec::new(),
            seen_header: false,
            content_length: None,
            body: Vec::new(),
            filled: 0,
        }
    }

    /// Block until a complete message arrives
    ///
    /// Returns [`CodecError::StreamClosed`] if the stream ends on a message
    /// boundary and [`CodecError::Malformed`] if it ends inside one.
    pub fn poll_message(&mut self) -> Result<Message, CodecError> {
        match self.read_frame(None)? {
            Some(message) => Ok(message),
            None => unreachable!("no deadline was given"),
        }
    }

    /// Wait at most `timeout` for a complete message
    pub fn try_poll_message(&mut self, timeout: Duration) -> Result<PollResult, CodecError> {
        self.poll_until(Instant::now() + timeout)
    }

    /// Wait until `deadline` for a complete message
    pub fn poll_until(&mut self, deadline: Instant) -> Result<PollResult, CodecError> {
        Ok(match self.read_frame(Some(deadline))? {
            Some(message) => PollResult::Message(message),
            None => PollResult::Timeout,
        })
    }

    fn reset(&mut self) {
        self.state = ReaderState::Header;
        self.line.clear();
        self.seen_header = false;
        self.content_length = None;
        self.body.clear();
        self.filled = 0;
    }

    fn fail(&mut self, error: CodecError) -> Result<Option<Message>, CodecError> {
        self.reset();
        Err(error)
    }

    /// Returns `Ok(None)` only when `deadline` has passed
    fn read_frame(&mut self, deadline: Option<Instant>) -> Result<Option<Message>, CodecError> {
        loop {
            let progress = match self.state {
                ReaderState::Header => self.input.read_until(b'\n', &mut self.line),
                ReaderState::Content => self.input.read(&mut self.body[self.filled..]),
            };

            let read_size = match progress {
                Ok(n) => n,
                Err(e) if is_idle(&e) => {
                    if e.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    if let Some(deadline) = deadline
                        && Instant::now() >= deadline
                    {
                        return Ok(None);
                    }
                    std::thread::sleep(IDLE_SLEEP);
                    continue;
                }
                Err(e) => return self.fail(CodecError::Io(e)),
            };

            match self.state {
                ReaderState::Header => {
                    if read_size == 0 {
                        if self.line.is_empty() && !self.seen_header {
                            return self.fail(CodecError::StreamClosed);
                        }
                        return self.fail(CodecError::malformed("stream ended inside headers"));
                    }
                    if !self.line.ends_with(b"\n") {
                        // partial line, keep what we have and read again
                        continue;
                    }
                    if let Err(e) = self.header_line() {
                        return self.fail(e);
                    }
                    if matches!(self.state, ReaderState::Content) && self.body.is_empty() {
                        // zero length body
                        return self.finish().map(Some);
                    }
                }
                ReaderState::Content => {
                    if read_size == 0 {
                        return self.fail(CodecError::malformed(format!(
                            "stream ended after {} of {} body bytes",
                            self.filled,
                            self.body.len()
                        )));
                    }
                    self.filled += read_size;
                    if self.filled == self.body.len() {
                        return self.finish().map(Some);
                    }
                }
            }
        }
    }

    fn header_line(&mut self) -> Result<(), CodecError> {
        let line = std::mem::take(&mut self.line);
        let text = std::str::from_utf8(&line)
            .map_err(|_| CodecError::malformed("header is not valid UTF-8"))?
            .trim_end_matches(['\r', '\n']);

        if text.is_empty() {
            if !self.seen_header {
                tracing::debug!("skipping blank line between messages");
                return Ok(());
            }
            let length = self
                .content_length
                .ok_or_else(|| CodecError::malformed("missing Content-Length header"))?;
            self.body = vec![0; length];
            self.filled = 0;
            self.state = ReaderState::Content;
            return Ok(());
        }

        self.seen_header = true;
        let (name, value) = text
            .split_once(':')
            .ok_or_else(|| CodecError::malformed(format!("invalid header line {text:?}")))?;
        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            let size: usize = value.trim().parse().map_err(|_| {
                CodecError::malformed(format!("invalid Content-Length {:?}", value.trim()))
            })?;
            if size > self.max_size {
                return Err(CodecError::MessageTooLarge {
                    size,
                    max: self.max_size,
                });
            }
            self.content_length = Some(size);
        } else {
            tracing::warn!(header = name.trim(), "ignoring unknown header");
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Message, CodecError> {
        let body = std::mem::take(&mut self.body);
        self.reset();
        let content =
            std::str::from_utf8(&body).map_err(|_| CodecError::malformed("body is not valid UTF-8"))?;
        tracing::debug!(content, "received raw message");
        serde_json::from_str(content)
            .map_err(|e| CodecError::malformed(format!("invalid message body: {e}")))
    }
}

fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
