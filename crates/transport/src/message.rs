use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::Event;
use crate::requests::Request;
use crate::responses::Response;
use crate::types::Seq;

/// A message received from the peer
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Request(IncomingRequest),
    Response(Response),
    Event(Event),
}

impl Message {
    pub fn seq(&self) -> Seq {
        match self {
            Message::Request(r) => r.seq,
            Message::Response(r) => r.seq,
            Message::Event(e) => e.seq,
        }
    }
}

/// A request received from the peer
///
/// The bridge only ever sees these from reverse requests issued by an adapter
/// (e.g. `runInTerminal`), or on the adapter side of the in-memory transport.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IncomingRequest {
    pub seq: Seq,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// A message to be written to the peer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutgoingMessage {
    Request(Request),
    Response(Response),
    Event(Event),
}

impl From<Request> for OutgoingMessage {
    fn from(request: Request) -> Self {
        OutgoingMessage::Request(request)
    }
}

impl From<Response> for OutgoingMessage {
    fn from(response: Response) -> Self {
        OutgoingMessage::Response(response)
    }
}

impl From<Event> for OutgoingMessage {
    fn from(event: Event) -> Self {
        OutgoingMessage::Event(event)
    }
}

impl Response {
    /// Successful response to the request `request_seq`
    pub fn success(request_seq: Seq, command: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            seq: 0,
            request_seq,
            success: true,
            command: command.into(),
            message: None,
            body,
        }
    }

    /// Failed response to the request `request_seq`
    pub fn failure(request_seq: Seq, command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            seq: 0,
            request_seq,
            success: false,
            command: command.into(),
            message: Some(message.into()),
            body: None,
        }
    }
}
