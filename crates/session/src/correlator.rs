//! Matching replies to requests
//!
//! After a request is written, the caller's thread reads messages one at a
//! time and classifies each of them until the [`Completion`] for that request
//! is met. Events seen along the way always update the session, whatever the
//! caller is waiting for.
use std::time::{Duration, Instant};

use transport::events::{Event, EventKind};
use transport::responses::Response;
use transport::types::Seq;
use transport::{CodecError, IncomingRequest, Message, OutgoingMessage, TransportError};

use crate::session::StopInfo;
use crate::{Session, SessionError};

/// What counts as the answer to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The correlated response
    Response,
    /// The correlated (successful) response, then the first `stopped` event
    /// after it. A `terminated` event completes the wait at any point.
    ExecutionStop,
    /// The correlated response, unless a `terminated` event comes first
    ResponseOrTerminated,
}

#[derive(Debug)]
pub(crate) enum Completed {
    Response(Response),
    Stopped(StopInfo),
    Terminated,
}

enum Classified {
    /// Answers the request being waited for
    Awaited(Response),
    /// Answers an earlier request whose wait was cut short
    Abandoned(Response),
    /// Answers nothing this session is waiting on
    Unknown(Response),
    Event(Event),
    ReverseRequest(IncomingRequest),
}

impl Session {
    fn classify(&self, message: Message, awaited: Seq) -> Classified {
        match message {
            Message::Response(response) if response.request_seq == awaited => {
                Classified::Awaited(response)
            }
            Message::Response(response) if self.outstanding.contains(&response.request_seq) => {
                Classified::Abandoned(response)
            }
            Message::Response(response) => Classified::Unknown(response),
            Message::Event(event) => Classified::Event(event),
            Message::Request(request) => Classified::ReverseRequest(request),
        }
    }

    /// Block until `completion` is met for request `seq`
    pub(crate) fn await_completion(
        &mut self,
        seq: Seq,
        completion: Completion,
    ) -> Result<Completed, SessionError> {
        let timeout = match completion {
            Completion::Response => self.response_timeout,
            Completion::ExecutionStop | Completion::ResponseOrTerminated => None,
        };
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut answered = false;

        loop {
            let message = self.receive(seq, deadline, timeout)?;
            match self.classify(message, seq) {
                Classified::Awaited(response) => {
                    self.outstanding.remove(&seq);
                    if !response.success {
                        return Err(remote_failure(response));
                    }
                    match completion {
                        Completion::ExecutionStop => {
                            answered = true;
                            self.resumed();
                        }
                        Completion::Response | Completion::ResponseOrTerminated => {
                            return Ok(Completed::Response(response));
                        }
                    }
                }
                Classified::Abandoned(response) => {
                    tracing::debug!(
                        request_seq = response.request_seq,
                        command = %response.command,
                        success = response.success,
                        "draining response to abandoned request"
                    );
                    self.outstanding.remove(&response.request_seq);
                }
                Classified::Unknown(response) => {
                    tracing::error!(
                        request_seq = response.request_seq,
                        expected = seq,
                        command = %response.command,
                        "response does not match any outstanding request"
                    );
                    self.force_terminated();
                    return Err(SessionError::ProtocolDesync {
                        request_seq: response.request_seq,
                        expected: seq,
                    });
                }
                Classified::Event(event) => match (completion, self.observe(event)) {
                    (Completion::ExecutionStop, EventKind::Stopped(body)) if answered => {
                        return Ok(Completed::Stopped(StopInfo::from(body)));
                    }
                    (Completion::ExecutionStop, EventKind::Stopped(_)) => {
                        tracing::debug!(seq, "ignoring stop reported before the response");
                    }
                    (
                        Completion::ExecutionStop | Completion::ResponseOrTerminated,
                        EventKind::Terminated,
                    ) => return Ok(Completed::Terminated),
                    _ => {}
                },
                Classified::ReverseRequest(request) => self.decline(request)?,
            }
        }
    }

    /// Await a plain response
    pub(crate) fn await_response(&mut self, seq: Seq) -> Result<Response, SessionError> {
        match self.await_completion(seq, Completion::Response)? {
            Completed::Response(response) => Ok(response),
            Completed::Stopped(_) | Completed::Terminated => {
                unreachable!("plain response waits only complete with a response")
            }
        }
    }

    fn receive(
        &mut self,
        awaited: Seq,
        deadline: Option<Instant>,
        timeout: Option<Duration>,
    ) -> Result<Message, SessionError> {
        let connection = self.connection.as_mut().ok_or(SessionError::NotConnected)?;
        let received = match deadline {
            Some(deadline) => connection.receive_until(deadline),
            None => connection.receive_one().map(Some),
        };

        let reason = match received {
            Ok(Some(message)) => {
                trace_message(&message);
                return Ok(message);
            }
            Ok(None) => format!(
                "no response to request {awaited} within {:?}",
                timeout.unwrap_or_default()
            ),
            Err(TransportError::Codec(CodecError::Malformed(reason))) => {
                tracing::error!(%reason, awaited, "malformed message from debugger");
                self.force_terminated();
                return Err(SessionError::MalformedMessage(reason));
            }
            Err(TransportError::Codec(e @ CodecError::MessageTooLarge { .. })) => {
                tracing::error!(error = %e, awaited, "oversized message from debugger");
                self.force_terminated();
                return Err(SessionError::MalformedMessage(e.to_string()));
            }
            Err(e) => e.to_string(),
        };

        tracing::error!(%reason, awaited, "lost connection to debugger");
        self.force_terminated();
        Err(SessionError::SessionLost(reason))
    }

    /// Answer a request from the adapter with a failure
    ///
    /// Reverse requests such as `runInTerminal` are not supported, but the
    /// adapter must still get a reply so it does not wait forever.
    fn decline(&mut self, request: IncomingRequest) -> Result<(), SessionError> {
        tracing::warn!(command = %request.command, seq = request.seq, "declining reverse request");
        let Some(connection) = self.connection.as_mut() else {
            return Err(SessionError::NotConnected);
        };
        let mut response = Response::failure(request.seq, request.command, "not supported by client");
        response.seq = self.next_seq;
        self.next_seq += 1;
        if let Err(e) = connection.send(&OutgoingMessage::Response(response)) {
            tracing::error!(error = %e, "could not answer reverse request");
            self.force_terminated();
            return Err(SessionError::StreamClosed(e));
        }
        Ok(())
    }
}

fn remote_failure(response: Response) -> SessionError {
    let detail = response
        .body
        .as_ref()
        .and_then(|body| body.pointer("/error/format"))
        .and_then(|format| format.as_str())
        .map(str::to_string);
    SessionError::RemoteOperation {
        message: response
            .message
            .unwrap_or_else(|| "no message from debugger".to_string()),
        command: response.command,
        detail,
    }
}

fn trace_message(message: &Message) {
    match message {
        Message::Response(r) => tracing::debug!(
            seq = r.seq,
            request_seq = r.request_seq,
            command = %r.command,
            success = r.success,
            "received response"
        ),
        Message::Event(e) => tracing::debug!(seq = e.seq, event = %e.event, "received event"),
        Message::Request(r) => tracing::debug!(seq = r.seq, command = %r.command, "received request"),
    }
}
