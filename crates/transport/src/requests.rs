//! Requests you can send to a DAP server
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{
    FunctionBreakpoint, Seq, Source, SourceBreakpoint, StackFrameId, ThreadId,
    VariablesReference,
};

/// A request with its allocated sequence number
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub seq: Seq,
    #[serde(flatten)]
    pub body: RequestBody,
}

#[derive(Debug, Serialize, Clone)]
#[serde(tag = "command", content = "arguments", rename_all = "camelCase")]
pub enum RequestBody {
    Initialize(Initialize),
    Launch(Launch),
    Attach(Attach),
    SetBreakpoints(SetBreakpoints),
    SetFunctionBreakpoints(SetFunctionBreakpoints),
    ConfigurationDone,
    Continue(Continue),
    Next(Next),
    StepIn(StepIn),
    StepOut(StepOut),
    Pause(Pause),
    Threads,
    StackTrace(StackTrace),
    Scopes(Scopes),
    Variables(Variables),
    Evaluate(Evaluate),
    SetVariable(SetVariable),
    Restart(Restart),
    Terminate(Terminate),
    Disconnect(Disconnect),
    ExceptionInfo(ExceptionInfo),
    LoadedSources,
    Modules(Modules),
    Disassemble(Disassemble),
}

impl RequestBody {
    /// The wire name of the command
    pub fn command(&self) -> &'static str {
        match self {
            RequestBody::Initialize(_) => "initialize",
            RequestBody::Launch(_) => "launch",
            RequestBody::Attach(_) => "attach",
            RequestBody::SetBreakpoints(_) => "setBreakpoints",
            RequestBody::SetFunctionBreakpoints(_) => "setFunctionBreakpoints",
            RequestBody::ConfigurationDone => "configurationDone",
            RequestBody::Continue(_) => "continue",
            RequestBody::Next(_) => "next",
            RequestBody::StepIn(_) => "stepIn",
            RequestBody::StepOut(_) => "stepOut",
            RequestBody::Pause(_) => "pause",
            RequestBody::Threads => "threads",
            RequestBody::StackTrace(_) => "stackTrace",
            RequestBody::Scopes(_) => "scopes",
            RequestBody::Variables(_) => "variables",
            RequestBody::Evaluate(_) => "evaluate",
            RequestBody::SetVariable(_) => "setVariable",
            RequestBody::Restart(_) => "restart",
            RequestBody::Terminate(_) => "terminate",
            RequestBody::Disconnect(_) => "disconnect",
            RequestBody::ExceptionInfo(_) => "exceptionInfo",
            RequestBody::LoadedSources => "loadedSources",
            RequestBody::Modules(_) => "modules",
            RequestBody::Disassemble(_) => "disassemble",
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Initialize {
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    pub path_format: PathFormat,
    #[serde(rename = "linesStartAt1")]
    pub lines_start_at_one: bool,
    #[serde(rename = "columnsStartAt1")]
    pub columns_start_at_one: bool,
    pub supports_variable_type: bool,
    pub supports_variable_paging: bool,
    pub supports_run_in_terminal_request: bool,
    pub locale: String,
}

impl Default for Initialize {
    fn default() -> Self {
        Self {
            client_id: "go".to_string(),
            adapter_id: "go".to_string(),
            path_format: PathFormat::Path,
            lines_start_at_one: true,
            columns_start_at_one: true,
            supports_variable_type: true,
            supports_variable_paging: true,
            supports_run_in_terminal_request: true,
            locale: "en-us".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PathFormat {
    Path,
    Uri,
}

/// How delve should obtain the debuggee binary
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Compile the package at `program` and debug the result
    Debug,
    /// Debug an already compiled binary
    Exec,
}

impl LaunchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchMode::Debug => "debug",
            LaunchMode::Exec => "exec",
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    /// Always `"launch"`; delve reads it from the arguments
    pub request: String,
    pub mode: LaunchMode,
    pub program: PathBuf,
    pub stop_on_entry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

impl Launch {
    pub fn new(mode: LaunchMode, program: impl Into<PathBuf>) -> Self {
        Self {
            request: "launch".to_string(),
            mode,
            program: program.into(),
            stop_on_entry: true,
            args: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttachMode {
    Local,
    Remote,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Attach {
    pub request: String,
    pub mode: AttachMode,
    pub process_id: i64,
}

#[derive(Debug, Default, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpoints {
    pub source: Source,
    pub breakpoints: Vec<SourceBreakpoint>,
    pub lines: Vec<i64>,
}

#[derive(Debug, Default, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SetFunctionBreakpoints {
    pub breakpoints: Vec<FunctionBreakpoint>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Continue {
    pub thread_id: ThreadId,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Next {
    pub thread_id: ThreadId,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StepIn {
    pub thread_id: ThreadId,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StepOut {
    pub thread_id: ThreadId,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Pause {
    pub thread_id: ThreadId,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StackTrace {
    pub thread_id: ThreadId,
    pub start_frame: i64,
    pub levels: i64,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Scopes {
    pub frame_id: StackFrameId,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Variables {
    pub variables_reference: VariablesReference,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Evaluate {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<StackFrameId>,
    pub context: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SetVariable {
    pub variables_reference: VariablesReference,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Restart {
    /// The launch arguments the debuggee is relaunched with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Launch>,
}

#[derive(Debug, Default, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Terminate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<bool>,
}

#[derive(Debug, Default, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Disconnect {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminate_debuggee: Option<bool>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfo {
    pub thread_id: ThreadId,
}

#[derive(Debug, Default, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Modules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_module: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_count: Option<i64>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Disassemble {
    pub memory_reference: String,
    pub instruction_offset: i64,
    pub instruction_count: i64,
    pub resolve_symbols: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn to_value(body: RequestBody) -> serde_json::Value {
        serde_json::to_value(Request { seq: 7, body }).unwrap()
    }

    #[test]
    fn unit_requests_have_no_arguments() {
        let value = to_value(RequestBody::Threads);
        assert_eq!(value, json!({"seq": 7, "command": "threads"}));
    }

    #[test]
    fn launch_arguments_match_delve() {
        let mut launch = Launch::new(LaunchMode::Exec, "/tmp/prog");
        launch.args = Some(vec!["me".to_string()]);
        let value = to_value(RequestBody::Launch(launch));
        assert_eq!(
            value,
            json!({
                "seq": 7,
                "command": "launch",
                "arguments": {
                    "request": "launch",
                    "mode": "exec",
                    "program": "/tmp/prog",
                    "stopOnEntry": true,
                    "args": ["me"],
                }
            })
        );
    }

    #[test]
    fn initialize_uses_protocol_casing() {
        let value = to_value(RequestBody::Initialize(Initialize::default()));
        let arguments = &value["arguments"];
        assert_eq!(arguments["clientID"], "go");
        assert_eq!(arguments["adapterID"], "go");
        assert_eq!(arguments["linesStartAt1"], true);
        assert_eq!(arguments["columnsStartAt1"], true);
        assert_eq!(arguments["pathFormat"], "path");
        assert_eq!(arguments["supportsRunInTerminalRequest"], true);
    }

    #[test]
    fn empty_line_breakpoints_serialize_as_empty_lists() {
        let value = to_value(RequestBody::SetBreakpoints(SetBreakpoints {
            source: Source::from_path("/src/main.go"),
            ..Default::default()
        }));
        assert_eq!(value["arguments"]["source"], json!({"path": "/src/main.go"}));
        assert_eq!(value["arguments"]["breakpoints"], json!([]));
        assert_eq!(value["arguments"]["lines"], json!([]));
    }

    #[test]
    fn command_names_match_serialized_tag() {
        let bodies = [
            RequestBody::ConfigurationDone,
            RequestBody::StepIn(StepIn { thread_id: 1 }),
            RequestBody::ExceptionInfo(ExceptionInfo { thread_id: 1 }),
            RequestBody::LoadedSources,
            RequestBody::Disconnect(Disconnect::default()),
        ];
        for body in bodies {
            let command = body.command();
            assert_eq!(to_value(body)["command"], command);
        }
    }
}
