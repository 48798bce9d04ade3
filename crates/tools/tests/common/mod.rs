#![allow(dead_code)]

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread::{self, JoinHandle};

use eyre::{Result, WrapErr};
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

/// Directory holding the Go test programs
pub fn go_testdata() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join("go")
}

/// Build the Go program in `testdata/go/<name>` into `out_dir`
pub fn compile_go_program(name: &str, out_dir: &Path) -> Result<PathBuf> {
    let source_dir = go_testdata().join(name);
    let binary = out_dir.join(name);
    let status = Command::new("go")
        .args(["build", "-gcflags=all=-N -l", "-o"])
        .arg(&binary)
        .arg("main.go")
        .current_dir(&source_dir)
        .status()
        .wrap_err("running go build")?;
    eyre::ensure!(status.success(), "go build failed for {name}: {status}");
    Ok(binary)
}

/// One message the adapter writes in reply to a request
pub enum Reply {
    Ok(Value),
    Fail(&'static str),
    Event(&'static str, Value),
}

/// An adapter thread answering with `handler` until the client disconnects
pub fn spawn_adapter<F>(mut handler: F) -> (InMemoryTransport, JoinHandle<Result<Vec<IncomingRequest>>>)
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
                Ok(other) => eyre::bail!("adapter expected a request, got {other:?}"),
                Err(CodecError::StreamClosed) => return Ok(seen),
                Err(e) => return Err(e.into()),
            };
            for reply in handler(&request) {
                seq += 1;
                let message: OutgoingMessage = match reply {
                    Reply::Ok(body) => {
                        let mut response =
                            Response::success(request.seq, request.command.clone(), Some(body));
                        response.seq = seq;
                        response.into()
                    }
                    Reply::Fail(message) => {
                        let mut response =
                            Response::failure(request.seq, request.command.clone(), message);
                        response.seq = seq;
                        response.into()
                    }
                    Reply::Event(name, body) => {
                        let mut event = Event::new(name, Some(body));
                        event.seq = seq;
                        event.into()
                    }
                };
                writer.write_all(&transport::encode(&message)?)?;
            }
            seen.push(request);
        }
    });
    (client, handle)
}

/// Replies of `dlv dap` debugging the `helloworld` program, stopped at line 7
pub fn hello_world(request: &IncomingRequest) -> Vec<Reply> {
    let arguments = request.arguments.clone().unwrap_or(Value::Null);
    match request.command.as_str() {
        "initialize" => vec![
            Reply::Ok(json!({"supportsConfigurationDoneRequest": true})),
            Reply::Event("initialized", json!({})),
        ],
        "launch" | "attach" | "configurationDone" | "restart" | "disconnect" => {
            vec![Reply::Ok(json!({}))]
        }
        "setBreakpoints" => {
            let path = arguments["source"]["path"].clone();
            let breakpoints: Vec<Value> = arguments["breakpoints"]
                .as_array()
                .into_iter()
                .flatten()
                .enumerate()
                .map(|(i, bp)| {
                    json!({"id": i + 1, "verified": true, "line": bp["line"], "source": {"path": path}})
                })
                .collect();
            vec![Reply::Ok(json!({ "breakpoints": breakpoints }))]
        }
        "continue" => vec![
            Reply::Ok(json!({"allThreadsContinued": true})),
            Reply::Event("output", json!({"category": "stdout", "output": "starting\n"})),
            Reply::Event(
                "stopped",
                json!({"reason": "breakpoint", "threadId": 1, "hitBreakpointIds": [1], "allThreadsStopped": true}),
            ),
        ],
        "stackTrace" => vec![Reply::Ok(json!({
            "stackFrames": [
                {"id": 1000, "name": "main.main", "source": {"path": "/src/helloworld/main.go"}, "line": 7, "column": 0},
                {"id": 1001, "name": "runtime.main", "source": {"path": "/usr/lib/go/src/runtime/proc.go"}, "line": 272, "column": 0, "presentationHint": "subtle"}
            ],
            "totalFrames": 2
        }))],
        "scopes" => vec![Reply::Ok(json!({
            "scopes": [
                {"name": "Locals", "variablesReference": 1000, "expensive": false},
                {"name": "Globals (package main)", "variablesReference": 0, "expensive": true}
            ]
        }))],
        "variables" => vec![Reply::Ok(json!({
            "variables": [{"name": "greeting", "value": "\"hello, world\"", "type": "string", "variablesReference": 0}]
        }))],
        "evaluate" if arguments["expression"] == "greeting" => vec![Reply::Ok(json!({
            "result": "\"hello, world\"", "type": "string", "variablesReference": 0
        }))],
        "evaluate" => vec![Reply::Fail("could not find symbol value")],
        _ => vec![Reply::Fail("unsupported")],
    }
}
