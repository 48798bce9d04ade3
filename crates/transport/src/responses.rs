//! Responses in reply to [`crate::requests`] from a DAP server
//!
//! A [`Response`] keeps its body as raw JSON so that it can always be
//! classified and correlated, even for commands whose body shape the bridge
//! does not know. Callers that know which command they issued decode the body
//! with [`Response::body_as`].
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::CodecError;
use crate::types::{
    self, DisassembledInstruction, ExceptionDetails, Module, Scope, Seq, Source, StackFrame,
    Thread, Variable, VariablesReference,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default)]
    pub seq: Seq,
    #[serde(rename = "request_seq")]
    pub request_seq: Seq,
    pub success: bool,
    #[serde(default)]
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Response {
    /// Decode the command specific body
    ///
    /// A missing body is decoded as an empty object so that bodies consisting
    /// only of optional fields still succeed.
    pub fn body_as<T>(&self) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        let body = match &self.body {
            Some(Value::Null) | None => Value::Object(Default::default()),
            Some(body) => body.clone(),
        };
        serde_json::from_value(body).map_err(|e| {
            CodecError::malformed(format!("invalid body for {} response: {e}", self.command))
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Capabilities {
    pub supports_configuration_done_request: Option<bool>,
    pub supports_function_breakpoints: Option<bool>,
    pub supports_conditional_breakpoints: Option<bool>,
    pub supports_hit_conditional_breakpoints: Option<bool>,
    pub supports_evaluate_for_hovers: Option<bool>,
    pub supports_step_back: Option<bool>,
    pub supports_set_variable: Option<bool>,
    pub supports_restart_frame: Option<bool>,
    pub supports_goto_targets_request: Option<bool>,
    pub supports_step_in_targets_request: Option<bool>,
    pub supports_completions_request: Option<bool>,
    pub supports_modules_request: Option<bool>,
    pub supports_restart_request: Option<bool>,
    pub supports_exception_options: Option<bool>,
    pub supports_value_formatting_options: Option<bool>,
    pub supports_exception_info_request: Option<bool>,
    pub support_terminate_debuggee: Option<bool>,
    pub supports_delayed_stack_trace_loading: Option<bool>,
    pub supports_loaded_sources_request: Option<bool>,
    pub supports_log_points: Option<bool>,
    pub supports_terminate_threads_request: Option<bool>,
    pub supports_set_expression: Option<bool>,
    pub supports_terminate_request: Option<bool>,
    pub supports_data_breakpoints: Option<bool>,
    pub supports_read_memory_request: Option<bool>,
    pub supports_disassemble_request: Option<bool>,
    pub supports_cancel_request: Option<bool>,
    pub supports_breakpoint_locations_request: Option<bool>,
    pub supports_clipboard_context: Option<bool>,
    pub supports_stepping_granularity: Option<bool>,
    pub supports_instruction_breakpoints: Option<bool>,
    pub supports_exception_filter_options: Option<bool>,
}

impl Capabilities {
    /// Whether the adapter advertised support for `command`
    ///
    /// Returns `None` when the adapter said nothing either way. Commands every
    /// adapter must implement always report `Some(true)`.
    pub fn supports(&self, command: &str) -> Option<bool> {
        match command {
            "configurationDone" => self.supports_configuration_done_request,
            "setFunctionBreakpoints" => self.supports_function_breakpoints,
            "setVariable" => self.supports_set_variable,
            "restart" => self.supports_restart_request,
            "terminate" => self.supports_terminate_request,
            "exceptionInfo" => self.supports_exception_info_request,
            "loadedSources" => self.supports_loaded_sources_request,
            "modules" => self.supports_modules_request,
            "disassemble" => self.supports_disassemble_request,
            _ => Some(true),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SetBreakpointsResponse {
    pub breakpoints: Vec<types::Breakpoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinueResponse {
    pub all_threads_continued: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadsResponse {
    pub threads: Vec<Thread>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StackTraceResponse {
    pub stack_frames: Vec<StackFrame>,
    pub total_frames: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScopesResponse {
    pub scopes: Vec<Scope>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VariablesResponse {
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub result: String,
    pub r#type: Option<String>,
    #[serde(default)]
    pub variables_reference: VariablesReference,
    pub named_variables: Option<i64>,
    pub indexed_variables: Option<i64>,
    pub memory_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableResponse {
    pub value: String,
    pub r#type: Option<String>,
    pub variables_reference: Option<VariablesReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfoResponse {
    pub exception_id: String,
    pub description: Option<String>,
    pub break_mode: String,
    pub details: Option<ExceptionDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadedSourcesResponse {
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ModulesResponse {
    pub modules: Vec<Module>,
    pub total_modules: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct DisassembleResponse {
    pub instructions: Vec<DisassembledInstruction>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn variables_response() {
        let response = r#"
    {
        "variables": [
            {
                "name": "greeting",
                "type": "string",
                "value": "\"hello, world\"",
                "evaluateName": "greeting",
                "variablesReference": 0
            },
            {
                "name": "p",
                "type": "main.Person",
                "value": "main.Person {Name: \"Alice\", Age: 30}",
                "evaluateName": "p",
                "variablesReference": 1001,
                "namedVariables": 2
            }
        ]
    }
        "#;

        let response: VariablesResponse = serde_json::from_str(response).unwrap();
        assert_eq!(response.variables.len(), 2);
        assert_eq!(response.variables[1].variables_reference, 1001);
    }

    #[test]
    fn missing_body_decodes_as_defaults() {
        let response = Response {
            seq: 3,
            request_seq: 2,
            success: true,
            command: "threads".to_string(),
            message: None,
            body: None,
        };
        let body: ThreadsResponse = response.body_as().unwrap();
        assert!(body.threads.is_empty());
    }

    #[test]
    fn invalid_body_is_malformed() {
        let response = Response {
            seq: 3,
            request_seq: 2,
            success: true,
            command: "evaluate".to_string(),
            message: None,
            body: Some(json!({"result": 12})),
        };
        let err = response.body_as::<EvaluateResponse>().unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)), "got {err:?}");
    }

    #[test]
    fn stack_trace_response_from_delve() {
        let body = json!({
            "stackFrames": [
                {
                    "id": 1000,
                    "name": "main.main",
                    "source": {"name": "main.go", "path": "/src/main.go"},
                    "line": 7,
                    "column": 0,
                    "instructionPointerReference": "0x49d3b4"
                },
                {
                    "id": 1001,
                    "name": "runtime.main",
                    "source": {"name": "proc.go", "path": "/go/src/runtime/proc.go"},
                    "line": 272,
                    "column": 0,
                    "presentationHint": "subtle"
                }
            ],
            "totalFrames": 2
        });
        let response: StackTraceResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.total_frames, Some(2));
        assert_eq!(response.stack_frames[1].presentation_hint.as_deref(), Some("subtle"));
    }

    #[test]
    fn capabilities_are_advisory() {
        let caps: Capabilities = serde_json::from_value(json!({
            "supportsConfigurationDoneRequest": true,
            "supportsRestartRequest": false
        }))
        .unwrap();
        assert_eq!(caps.supports("configurationDone"), Some(true));
        assert_eq!(caps.supports("restart"), Some(false));
        assert_eq!(caps.supports("disassemble"), None);
        assert_eq!(caps.supports("threads"), Some(true));
    }
}
