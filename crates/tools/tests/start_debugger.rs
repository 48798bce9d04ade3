//! `start-debugger` against stand-in debugger commands
mod common;

use config::{BridgeConfig, DebuggerConfig};
use serde_json::{Value, json};
use session::SessionError;
use tools::{Bridge, ToolError};

#[ctor::ctor]
fn init() {
    common::init_logging();
}

fn stand_in(command: &str, script: &str) -> BridgeConfig {
    BridgeConfig {
        debugger: DebuggerConfig {
            command: command.to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            ready_line: "DAP server listening at".to_string(),
            startup_timeout_secs: 1,
        },
        ..BridgeConfig::default()
    }
}

#[test]
fn debugger_that_never_listens_times_out() {
    let bridge = Bridge::new(stand_in("sh", "exec sleep 30"));

    let err = bridge
        .call("start-debugger", json!({"port": ":9"}))
        .unwrap_err();
    assert!(
        matches!(
            err,
            ToolError::Session {
                source: SessionError::StartupTimeout(_),
                ..
            }
        ),
        "{err:?}"
    );
    assert_eq!(
        bridge.call("stop-debugger", Value::Null).unwrap(),
        "No debugger currently executing."
    );
}

#[test]
fn missing_debugger_binary() {
    let bridge = Bridge::new(stand_in("/nonexistent/dlv", "")).with_default_port(9);

    let err = bridge.call("start-debugger", Value::Null).unwrap_err();
    assert!(
        matches!(
            err,
            ToolError::Session {
                source: SessionError::Server(_),
                ..
            }
        ),
        "{err:?}"
    );
    assert!(err.to_string().starts_with("unable to start debugger"));
}
