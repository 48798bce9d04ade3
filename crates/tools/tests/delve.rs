//! End to end runs against a real `dlv dap`
//!
//! These need `go` and `dlv` on the `PATH`:
//!
//! ```text
//! cargo test -p dap-bridge-tools --test delve -- --ignored
//! ```
mod common;

use std::path::{Path, PathBuf};

use common::compile_go_program;
use config::BridgeConfig;
use eyre::Result;
use serde_json::{Value, json};
use tempfile::TempDir;
use tools::Bridge;
use transport::bindings::get_random_tcp_port;

#[ctor::ctor]
fn init() {
    common::init_logging();
}

struct Fixture {
    bridge: Bridge,
    binary: PathBuf,
    source: PathBuf,
    _build_dir: TempDir,
}

impl Fixture {
    /// Compile `program` and start a debugger for it
    fn start(program: &str) -> Result<Self> {
        let build_dir = tempfile::tempdir()?;
        let binary = compile_go_program(program, build_dir.path())?;
        let source = common::go_testdata().join(program).join("main.go");

        let bridge = Bridge::new(BridgeConfig::default());
        let port = get_random_tcp_port()?;
        let started = bridge.call("start-debugger", json!({ "port": port }))?;
        assert!(started.starts_with("Started debugger at: 127.0.0.1:"));

        Ok(Self {
            bridge,
            binary,
            source,
            _build_dir: build_dir,
        })
    }

    fn call(&self, tool: &str, arguments: Value) -> Result<String> {
        Ok(self.bridge.call(tool, arguments)?)
    }

    fn exec(&self, args: &[&str]) -> Result<String> {
        self.call("exec-program", json!({"path": self.binary, "args": args}))
    }

    fn break_at(&self, lines: &[i64]) -> Result<String> {
        self.call(
            "set-breakpoints",
            json!({"file": path_str(&self.source), "lines": lines}),
        )
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

#[test]
#[ignore = "needs go and dlv"]
fn hello_world_breakpoint() -> Result<()> {
    let fixture = Fixture::start("helloworld")?;
    fixture.exec(&[])?;

    let created = fixture.break_at(&[7])?;
    assert!(created.starts_with("Breakpoint created at"), "{created}");
    fixture.call("configuration-done", Value::Null)?;

    let stopped = fixture.call("continue", json!({}))?;
    assert!(stopped.contains("hitting breakpoint"), "{stopped}");

    let trace = fixture.call("stack-trace", json!({"threadId": 1}))?;
    assert!(trace.contains("main.main"), "{trace}");
    assert!(trace.contains("main.go:7"), "{trace}");

    let value = fixture.call("evaluate", json!({"expression": "greeting"}))?;
    assert_eq!(value, "\"hello, world\" (type: string)");

    let finished = fixture.call("continue", json!({}))?;
    assert!(finished.contains("to program termination"), "{finished}");

    assert_eq!(fixture.call("stop-debugger", Value::Null)?, "Debugger stopped.");
    Ok(())
}

#[test]
#[ignore = "needs go and dlv"]
fn step_over_lines() -> Result<()> {
    let fixture = Fixture::start("step")?;
    fixture.exec(&[])?;
    fixture.break_at(&[7])?;
    fixture.call("configuration-done", Value::Null)?;
    fixture.call("continue", json!({}))?;

    let stepped = fixture.call("next", json!({"threadId": 1}))?;
    assert!(stepped.starts_with("Stepped to next line..."), "{stepped}");
    assert!(stepped.contains("reason: step"), "{stepped}");

    let trace = fixture.call("stack-trace", json!({}))?;
    assert!(trace.contains("main.go:10"), "{trace}");

    let x = fixture.call("evaluate", json!({"expression": "x"}))?;
    assert_eq!(x, "10 (type: int)");

    fixture.call("stop-debugger", Value::Null)?;
    Ok(())
}

#[test]
#[ignore = "needs go and dlv"]
fn scopes_list_locals() -> Result<()> {
    let fixture = Fixture::start("scopes")?;
    fixture.exec(&[])?;
    fixture.break_at(&[54])?;
    fixture.call("configuration-done", Value::Null)?;
    fixture.call("continue", json!({}))?;

    let trace = fixture.call("stack-trace", json!({}))?;
    let frame_id: i64 = trace
        .split("(Frame ID: ")
        .nth(1)
        .and_then(|rest| rest.split(')').next())
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| eyre::eyre!("no frame in {trace}"))?;

    let scopes = fixture.call("scopes", json!({ "frameId": frame_id }))?;
    assert!(scopes.contains("description (string)"), "{scopes}");
    assert!(scopes.contains("isAdult (bool) = true"), "{scopes}");
    assert!(scopes.contains("p (main.Person)"), "{scopes}");

    fixture.call("stop-debugger", Value::Null)?;
    Ok(())
}

#[test]
#[ignore = "needs go and dlv"]
fn restart_with_new_arguments() -> Result<()> {
    let fixture = Fixture::start("restart")?;
    fixture.exec(&["world"])?;
    fixture.break_at(&[15])?;
    fixture.call("configuration-done", Value::Null)?;
    fixture.call("continue", json!({}))?;
    assert_eq!(
        fixture.call("evaluate", json!({"expression": "greeting"}))?,
        "\"hello world\" (type: string)"
    );

    assert_eq!(
        fixture.call("restart", json!({"args": ["me"]}))?,
        "Restarted debugging session"
    );
    fixture.break_at(&[15])?;
    fixture.call("configuration-done", Value::Null)?;
    fixture.call("continue", json!({}))?;
    assert_eq!(
        fixture.call("evaluate", json!({"expression": "greeting"}))?,
        "\"hello me\" (type: string)"
    );

    fixture.call("stop-debugger", Value::Null)?;
    Ok(())
}
