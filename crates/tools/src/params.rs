//! Arguments accepted by each tool
//!
//! Field names are camelCase on the wire. Identifiers also accept the
//! `threadID`/`frameID` spelling some clients send.
use std::path::PathBuf;

use serde::Deserialize;

/// Port for `start-debugger`; a string (`"9090"` or `":9090"`) or a number
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Port {
    Number(u16),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct StartDebuggerParams {
    pub port: Option<Port>,
}

#[derive(Debug, Deserialize)]
pub struct ProgramParams {
    pub path: PathBuf,
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachParams {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(alias = "processID", alias = "pid")]
    pub process_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetBreakpointsParams {
    pub file: PathBuf,
    #[serde(default)]
    pub lines: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetFunctionBreakpointsParams {
    #[serde(default)]
    pub functions: Vec<String>,
}

/// Arguments of `continue`, `next`, `step-in`, `step-out`, `pause` and
/// `exception-info`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadParams {
    #[serde(default = "default_thread", alias = "threadID")]
    pub thread_id: i64,
}

fn default_thread() -> i64 {
    1
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceParams {
    #[serde(default = "default_thread", alias = "threadID")]
    pub thread_id: i64,
    #[serde(default)]
    pub start_frame: i64,
    #[serde(default)]
    pub levels: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesParams {
    #[serde(alias = "frameID")]
    pub frame_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesParams {
    pub variables_reference: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    pub expression: String,
    #[serde(default, alias = "frameID")]
    pub frame_id: Option<i64>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableParams {
    pub variables_reference: i64,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RestartParams {
    /// Replaces the program arguments; absent or empty keeps the previous ones
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectParams {
    #[serde(default)]
    pub terminate_debuggee: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulesParams {
    #[serde(default)]
    pub start_module: Option<i64>,
    #[serde(default)]
    pub module_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisassembleParams {
    pub memory_reference: String,
    #[serde(default)]
    pub instruction_offset: i64,
    #[serde(default = "default_instruction_count")]
    pub instruction_count: i64,
}

fn default_instruction_count() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn thread_id_spellings() {
        let params: ThreadParams = serde_json::from_value(json!({"threadID": 4})).unwrap();
        assert_eq!(params.thread_id, 4);
        let params: ThreadParams = serde_json::from_value(json!({"threadId": 5})).unwrap();
        assert_eq!(params.thread_id, 5);
        let params: ThreadParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params.thread_id, 1);
    }

    #[test]
    fn port_forms() {
        let params: StartDebuggerParams = serde_json::from_value(json!({"port": ":9090"})).unwrap();
        assert_eq!(params.port, Some(Port::Text(":9090".to_string())));
        let params: StartDebuggerParams = serde_json::from_value(json!({"port": 9090})).unwrap();
        assert_eq!(params.port, Some(Port::Number(9090)));
        let params: StartDebuggerParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params.port, None);
    }

    #[test]
    fn breakpoints_require_a_file() {
        assert!(serde_json::from_value::<SetBreakpointsParams>(json!({"lines": [7]})).is_err());
        let params: SetBreakpointsParams =
            serde_json::from_value(json!({"file": "/src/main.go"})).unwrap();
        assert!(params.lines.is_empty());
    }
}
