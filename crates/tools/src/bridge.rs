use std::sync::{Mutex, MutexGuard, PoisonError};

use config::BridgeConfig;
use serde::de::DeserializeOwned;
use serde_json::Value;
use session::{RequestOutcome, Session, StartOptions, StopOutcome};
use transport::DapTransport;
use transport::requests::{AttachMode, LaunchMode};

use crate::error::SessionContext;
use crate::params::{
    AttachParams, DisassembleParams, DisconnectParams, EvaluateParams, ModulesParams, Port,
    ProgramParams, RestartParams, ScopesParams, SetBreakpointsParams,
    SetFunctionBreakpointsParams, SetVariableParams, StackTraceParams, StartDebuggerParams,
    ThreadParams, VariablesParams,
};
use crate::{Tool, ToolError, format};

/// Owns the single debug session and runs tool calls against it
///
/// Tool calls are serialized: a call blocks until any call already running
/// (which may be waiting on the debuggee) has finished.
pub struct Bridge {
    session: Mutex<Session>,
    config: BridgeConfig,
    default_port: Option<u16>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        let mut session = Session::new();
        session.set_response_timeout(config.response_timeout());
        Self {
            session: Mutex::new(session),
            config,
            default_port: None,
        }
    }

    /// Port used by `start-debugger` when the call does not name one
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = Some(port);
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the tool called `name` with JSON `arguments`
    ///
    /// `null` arguments are treated as an empty object.
    #[tracing::instrument(skip(self, arguments))]
    pub fn call(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        let tool: Tool = name.parse()?;
        let result = self.dispatch(tool, arguments);
        if let Err(e) = &result {
            tracing::debug!(%tool, error = %e, "tool call failed");
        }
        result
    }

    fn dispatch(&self, tool: Tool, arguments: Value) -> Result<String, ToolError> {
        match tool {
            Tool::StartDebugger => self.start_debugger(parse(tool, arguments)?),
            Tool::StopDebugger => self.stop_debugger(),
            Tool::DebugProgram => self.launch(LaunchMode::Debug, parse(tool, arguments)?),
            Tool::ExecProgram => self.launch(LaunchMode::Exec, parse(tool, arguments)?),
            Tool::Attach => self.attach(parse(tool, arguments)?),
            Tool::SetBreakpoints => self.set_breakpoints(parse(tool, arguments)?),
            Tool::SetFunctionBreakpoints => self.set_function_breakpoints(parse(tool, arguments)?),
            Tool::ConfigurationDone => self.configuration_done(),
            Tool::Continue => self.r#continue(parse(tool, arguments)?),
            Tool::Next => self.next(parse(tool, arguments)?),
            Tool::StepIn => self.step_in(parse(tool, arguments)?),
            Tool::StepOut => self.step_out(parse(tool, arguments)?),
            Tool::Pause => self.pause(parse(tool, arguments)?),
            Tool::Threads => self.threads(),
            Tool::StackTrace => self.stack_trace(parse(tool, arguments)?),
            Tool::Scopes => self.scopes(parse(tool, arguments)?),
            Tool::Variables => self.variables(parse(tool, arguments)?),
            Tool::Evaluate => self.evaluate(parse(tool, arguments)?),
            Tool::SetVariable => self.set_variable(parse(tool, arguments)?),
            Tool::Restart => self.restart(parse(tool, arguments)?),
            Tool::Terminate => self.terminate(),
            Tool::Disconnect => self.disconnect(parse(tool, arguments)?),
            Tool::ExceptionInfo => self.exception_info(parse(tool, arguments)?),
            Tool::LoadedSources => self.loaded_sources(),
            Tool::Modules => self.modules(parse(tool, arguments)?),
            Tool::Disassemble => self.disassemble(parse(tool, arguments)?),
        }
    }

    /// Spawn the configured debugger on `host:port` and connect to it
    pub fn start_debugger(&self, params: StartDebuggerParams) -> Result<String, ToolError> {
        let port = match params.port {
            Some(port) => normalize_port(&port)?,
            None => self.default_port.ok_or(ToolError::MissingPort)?,
        };
        let options = StartOptions {
            server: self.config.debugger.server_command(),
            address: self.config.address(port),
            response_timeout: self.config.response_timeout(),
        };
        let capabilities = self
            .session()
            .start(&options)
            .context("unable to start debugger")?;
        Ok(format::started(&options.address, &capabilities))
    }

    /// Start a session over an already connected transport instead of
    /// spawning a debugger
    pub fn start_with_transport<T>(&self, transport: T) -> Result<String, ToolError>
    where
        T: DapTransport,
    {
        let capabilities = self
            .session()
            .start_with_transport(transport)
            .context("unable to start debugger")?;
        Ok(format::started("existing connection", &capabilities))
    }

    pub fn stop_debugger(&self) -> Result<String, ToolError> {
        let outcome = self
            .session()
            .stop()
            .context("unable to stop debugger")?;
        Ok(match outcome {
            StopOutcome::Stopped => "Debugger stopped.".to_string(),
            StopOutcome::NothingRunning => "No debugger currently executing.".to_string(),
        })
    }

    pub fn launch(&self, mode: LaunchMode, params: ProgramParams) -> Result<String, ToolError> {
        let context = match mode {
            LaunchMode::Debug => "unable to launch program to debug via DAP server",
            LaunchMode::Exec => "unable to exec program to debug via DAP server",
        };
        let args = params.args.filter(|args| !args.is_empty());
        self.session()
            .launch(mode, &params.path, args)
            .context(context)?;
        Ok(format!("Started debugging: {}", params.path.display()))
    }

    pub fn attach(&self, params: AttachParams) -> Result<String, ToolError> {
        let mode = match params.mode.as_deref() {
            None | Some("") | Some("local") => AttachMode::Local,
            Some("remote") => AttachMode::Remote,
            Some(other) => return Err(ToolError::InvalidAttachMode(other.to_string())),
        };
        self.session()
            .attach(mode, params.process_id)
            .context("unable to attach to process")?;
        Ok(format!("Attached to process {}", params.process_id))
    }

    pub fn set_breakpoints(&self, params: SetBreakpointsParams) -> Result<String, ToolError> {
        let breakpoints = self
            .session()
            .set_breakpoints(&params.file, &params.lines)
            .context("unable to set breakpoints")?;
        Ok(format::breakpoints(&breakpoints))
    }

    pub fn set_function_breakpoints(
        &self,
        params: SetFunctionBreakpointsParams,
    ) -> Result<String, ToolError> {
        let breakpoints = self
            .session()
            .set_function_breakpoints(&params.functions)
            .context("unable to set function breakpoints")?;
        Ok(format::function_breakpoints(&breakpoints))
    }

    pub fn configuration_done(&self) -> Result<String, ToolError> {
        self.session()
            .configuration_done()
            .context("unable to complete configuration")?;
        Ok("Configuration done, debugging can begin".to_string())
    }

    pub fn r#continue(&self, params: ThreadParams) -> Result<String, ToolError> {
        let mut session = self.session();
        let outcome = session
            .r#continue(params.thread_id)
            .context("unable to continue")?;
        Ok(format::execution(
            "Continued execution",
            &outcome,
            &session.take_output(),
        ))
    }

    pub fn next(&self, params: ThreadParams) -> Result<String, ToolError> {
        let mut session = self.session();
        let outcome = session
            .next(params.thread_id)
            .context("unable to step to next line")?;
        Ok(format::execution(
            "Stepped to next line",
            &outcome,
            &session.take_output(),
        ))
    }

    pub fn step_in(&self, params: ThreadParams) -> Result<String, ToolError> {
        let mut session = self.session();
        let outcome = session
            .step_in(params.thread_id)
            .context("unable to step in")?;
        Ok(format::execution(
            "Stepped into function",
            &outcome,
            &session.take_output(),
        ))
    }

    pub fn step_out(&self, params: ThreadParams) -> Result<String, ToolError> {
        let mut session = self.session();
        let outcome = session
            .step_out(params.thread_id)
            .context("unable to step out")?;
        Ok(format::execution(
            "Stepped out of function",
            &outcome,
            &session.take_output(),
        ))
    }

    pub fn pause(&self, params: ThreadParams) -> Result<String, ToolError> {
        let outcome = self
            .session()
            .pause(params.thread_id)
            .context("unable to pause")?;
        Ok(format::paused(&outcome))
    }

    pub fn threads(&self) -> Result<String, ToolError> {
        let threads = self
            .session()
            .threads()
            .context("unable to get threads")?;
        Ok(format::threads(&threads))
    }

    pub fn stack_trace(&self, params: StackTraceParams) -> Result<String, ToolError> {
        let trace = self
            .session()
            .stack_trace(params.thread_id, params.start_frame, params.levels)
            .context("unable to get stack trace")?;
        Ok(format::stack_trace(params.thread_id, &trace))
    }

    /// Scopes of a frame together with the variables of each scope
    ///
    /// A scope whose variables cannot be fetched is still listed, unless the
    /// failure ended the session.
    pub fn scopes(&self, params: ScopesParams) -> Result<String, ToolError> {
        let mut session = self.session();
        let scopes = session
            .scopes(params.frame_id)
            .context("unable to get scopes")?;

        let mut listed = Vec::with_capacity(scopes.len());
        for scope in scopes {
            let variables = if scope.variables_reference > 0 {
                match session.variables(scope.variables_reference) {
                    Ok(variables) => Some(variables),
                    Err(source) if source.is_fatal() => {
                        return Err(ToolError::Session {
                            context: "unable to get scope variables",
                            source,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(scope = %scope.name, error = %e, "could not fetch scope variables");
                        None
                    }
                }
            } else {
                None
            };
            listed.push((scope, variables));
        }
        Ok(format::scopes(params.frame_id, &listed))
    }

    pub fn variables(&self, params: VariablesParams) -> Result<String, ToolError> {
        let variables = self
            .session()
            .variables(params.variables_reference)
            .context("unable to get variables")?;
        Ok(format::variables(params.variables_reference, &variables))
    }

    pub fn evaluate(&self, params: EvaluateParams) -> Result<String, ToolError> {
        let result = self
            .session()
            .evaluate(
                &params.expression,
                params.frame_id,
                params.context.as_deref(),
            )
            .context("unable to evaluate expression")?;
        Ok(format::evaluate(&result))
    }

    pub fn set_variable(&self, params: SetVariableParams) -> Result<String, ToolError> {
        let result = self
            .session()
            .set_variable(params.variables_reference, &params.name, &params.value)
            .context("unable to set variable")?;
        Ok(format::set_variable(&params.name, &result))
    }

    pub fn restart(&self, params: RestartParams) -> Result<String, ToolError> {
        let args = params.args.filter(|args| !args.is_empty());
        let outcome = self
            .session()
            .restart(args)
            .context("unable to restart debugger")?;
        Ok(match outcome {
            RequestOutcome::Completed => "Restarted debugging session".to_string(),
            RequestOutcome::Terminated => {
                "Debuggee terminated before the restart completed".to_string()
            }
        })
    }

    pub fn terminate(&self) -> Result<String, ToolError> {
        self.session()
            .terminate()
            .context("unable to terminate debugger")?;
        Ok("Terminated debuggee process".to_string())
    }

    pub fn disconnect(&self, params: DisconnectParams) -> Result<String, ToolError> {
        self.session()
            .disconnect(params.terminate_debuggee)
            .context("unable to disconnect")?;
        Ok("Disconnected from debugger".to_string())
    }

    pub fn exception_info(&self, params: ThreadParams) -> Result<String, ToolError> {
        let info = self
            .session()
            .exception_info(params.thread_id)
            .context("unable to get exception info")?;
        Ok(format::exception_info(params.thread_id, &info))
    }

    pub fn loaded_sources(&self) -> Result<String, ToolError> {
        let sources = self
            .session()
            .loaded_sources()
            .context("unable to get loaded sources")?;
        Ok(format::loaded_sources(&sources))
    }

    pub fn modules(&self, params: ModulesParams) -> Result<String, ToolError> {
        let modules = self
            .session()
            .modules(params.start_module, params.module_count)
            .context("unable to get modules")?;
        Ok(format::modules(&modules))
    }

    pub fn disassemble(&self, params: DisassembleParams) -> Result<String, ToolError> {
        let instructions = self
            .session()
            .disassemble(
                &params.memory_reference,
                params.instruction_offset,
                params.instruction_count,
            )
            .context("unable to disassemble")?;
        Ok(format::disassemble(&instructions))
    }
}

fn parse<T>(tool: Tool, arguments: Value) -> Result<T, ToolError>
where
    T: DeserializeOwned,
{
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|source| ToolError::InvalidArguments {
        tool: tool.name(),
        source,
    })
}

/// `"9090"`, `":9090"` and `9090` all name port 9090
fn normalize_port(port: &Port) -> Result<u16, ToolError> {
    match port {
        Port::Number(port) => Ok(*port),
        Port::Text(text) => {
            let trimmed = text.trim();
            trimmed
                .strip_prefix(':')
                .unwrap_or(trimmed)
                .parse()
                .map_err(|_| ToolError::InvalidPort(text.clone()))
        }
    }
}
