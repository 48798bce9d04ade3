//! A scripted debug adapter running on its own thread
#![allow(dead_code)]

use std::io::{IsTerminal, Write};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use eyre::Result;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use transport::events::Event;
use transport::io::{DapTransport, InMemoryTransport};
use transport::responses::Response;
use transport::{CodecError, FrameReader, IncomingRequest, Message, OutgoingMessage};

pub fn init_logging() {
    let in_ci = std::env::var("CI")
        .map(|val| val == "true")
        .unwrap_or(false);

    if std::io::stderr().is_terminal() || in_ci {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .json()
            .try_init();
    }

    let _ = color_eyre::install();
}

/// Something the adapter writes back after reading a request
#[derive(Debug, Clone)]
pub enum Reply {
    /// Successful response to the request just read
    Ok(Option<Value>),
    /// Failed response to the request just read
    Fail(&'static str, Option<Value>),
    Event(&'static str, Option<Value>),
    /// Successful response claiming to answer some other request
    ResponseTo(i64),
    /// A request from the adapter to the client
    ReverseRequest(&'static str),
    Sleep(Duration),
    /// Drop the connection
    Close,
}

pub struct Adapter {
    handle: JoinHandle<Result<Vec<IncomingRequest>>>,
}

impl Adapter {
    /// Run `handler` for every request until the client goes away or a
    /// [`Reply::Close`] is returned
    pub fn spawn<F>(mut handler: F) -> (InMemoryTransport, Adapter)
    where
        F: FnMut(&IncomingRequest) -> Vec<Reply> + Send + 'static,
    {
        let (client, adapter) = InMemoryTransport::pair();
        let handle = thread::spawn(move || {
            let (reader, mut writer) = adapter.split()?;
            let mut reader = FrameReader::new(reader);
            let mut seen = Vec::new();
            let mut seq = 0;

            loop {
                let request = match reader.poll_message() {
                    Ok(Message::Request(request)) => request,
                    Ok(Message::Response(response)) => {
                        tracing::debug!(?response, "adapter received client response");
                        continue;
                    }
                    Ok(Message::Event(event)) => eyre::bail!("unexpected event {event:?}"),
                    Err(CodecError::StreamClosed) => return Ok(seen),
                    Err(e) => return Err(e.into()),
                };

                for reply in handler(&request) {
                    let message: OutgoingMessage = match reply {
                        Reply::Ok(body) => {
                            Response::success(request.seq, request.command.clone(), body).into()
                        }
                        Reply::Fail(message, body) => {
                            let mut response =
                                Response::failure(request.seq, request.command.clone(), message);
                            response.body = body;
                            response.into()
                        }
                        Reply::Event(name, body) => Event::new(name, body).into(),
                        Reply::ResponseTo(request_seq) => {
                            Response::success(request_seq, request.command.clone(), None).into()
                        }
                        Reply::ReverseRequest(command) => {
                            seq += 1;
                            let frame = json!({"seq": seq, "type": "request", "command": command});
                            writer.write_all(&transport::codec::frame(frame.to_string().as_bytes()))?;
                            continue;
                        }
                        Reply::Sleep(duration) => {
                            thread::sleep(duration);
                            continue;
                        }
                        Reply::Close => {
                            seen.push(request);
                            return Ok(seen);
                        }
                    };
                    seq += 1;
                    let message = with_seq(message, seq);
                    writer.write_all(&transport::encode(&message)?)?;
                }
                seen.push(request);
            }
        });
        (client, Adapter { handle })
    }

    /// Wait for the adapter to finish and return every request it read
    pub fn join(self) -> Result<Vec<IncomingRequest>> {
        self.handle
            .join()
            .map_err(|_| eyre::eyre!("adapter thread panicked"))?
    }
}

fn with_seq(message: OutgoingMessage, seq: i64) -> OutgoingMessage {
    match message {
        OutgoingMessage::Response(mut response) => {
            response.seq = seq;
            response.into()
        }
        OutgoingMessage::Event(mut event) => {
            event.seq = seq;
            event.into()
        }
        other => other,
    }
}

/// Answers requests the way `dlv dap` does for a small Go program
pub fn delve_like(request: &IncomingRequest) -> Vec<Reply> {
    let arguments = request.arguments.clone().unwrap_or(Value::Null);
    match request.command.as_str() {
        "initialize" => vec![
            Reply::Ok(Some(json!({
                "supportsConfigurationDoneRequest": true,
                "supportsFunctionBreakpoints": true,
                "supportsSetVariable": true,
                "supportsExceptionInfoRequest": true,
                "supportsDisassembleRequest": true,
                "supportsRestartRequest": false
            }))),
            Reply::Event("initialized", None),
        ],
        "launch" | "attach" | "configurationDone" | "terminate" => vec![Reply::Ok(None)],
        "setBreakpoints" => {
            let breakpoints: Vec<Value> = arguments["breakpoints"]
                .as_array()
                .map(|bps| {
                    bps.iter()
                        .enumerate()
                        .map(|(i, bp)| json!({"id": i + 1, "verified": true, "line": bp["line"]}))
                        .collect()
                })
                .unwrap_or_default();
            vec![Reply::Ok(Some(json!({ "breakpoints": breakpoints })))]
        }
        "setFunctionBreakpoints" => {
            let breakpoints: Vec<Value> = arguments["breakpoints"]
                .as_array()
                .map(|bps| {
                    bps.iter()
                        .enumerate()
                        .map(|(i, _)| json!({"id": 100 + i, "verified": true}))
                        .collect()
                })
                .unwrap_or_default();
            vec![Reply::Ok(Some(json!({ "breakpoints": breakpoints })))]
        }
        "continue" => vec![
            Reply::Ok(Some(json!({"allThreadsContinued": true}))),
            Reply::Event(
                "stopped",
                Some(json!({
                    "reason": "breakpoint",
                    "threadId": 1,
                    "hitBreakpointIds": [1],
                    "allThreadsStopped": true
                })),
            ),
        ],
        "next" | "stepIn" | "stepOut" => vec![
            Reply::Ok(None),
            Reply::Event(
                "stopped",
                Some(json!({"reason": "step", "threadId": arguments["threadId"], "allThreadsStopped": true})),
            ),
        ],
        "threads" => vec![Reply::Ok(Some(json!({
            "threads": [{"id": 1, "name": "main.main"}, {"id": 2, "name": "runtime.gopark"}]
        })))],
        "stackTrace" => vec![Reply::Ok(Some(json!({
            "stackFrames": [
                {"id": 1000, "name": "main.main", "source": {"name": "main.go", "path": "/src/hello/main.go"}, "line": 7, "column": 0},
                {"id": 1001, "name": "runtime.main", "line": 272, "column": 0}
            ],
            "totalFrames": 2
        })))],
        "scopes" => vec![Reply::Ok(Some(json!({
            "scopes": [{"name": "Locals", "variablesReference": 1000, "expensive": false}]
        })))],
        "variables" => vec![Reply::Ok(Some(json!({
            "variables": [{"name": "greeting", "value": "\"hello\"", "type": "string", "variablesReference": 0}]
        })))],
        "evaluate" => vec![Reply::Ok(Some(json!({
            "result": "42", "type": "int", "variablesReference": 0
        })))],
        "disconnect" => vec![Reply::Ok(None), Reply::Close],
        _ => vec![Reply::Fail("unsupported command", None)],
    }
}
