use std::fmt;

/// Where a [`crate::Session`] is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No connection, no debugger process
    #[default]
    Idle,
    /// Connected and initialized; waiting for launch or attach
    Initializing,
    /// Debuggee launched or attached, halted until configuration is done
    Configuring,
    Running,
    Stopped,
    /// The debuggee ended, or the connection can no longer be trusted
    Terminated,
    /// The connection was closed with a disconnect request
    Disconnected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Initializing => "initializing",
            SessionState::Configuring => "configuring",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
            SessionState::Terminated => "terminated",
            SessionState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Everything a caller can ask a [`crate::Session`] to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Start,
    Launch,
    Attach,
    SetBreakpoints,
    SetFunctionBreakpoints,
    ConfigurationDone,
    Continue,
    Next,
    StepIn,
    StepOut,
    Pause,
    Threads,
    StackTrace,
    Scopes,
    Variables,
    Evaluate,
    SetVariable,
    Restart,
    Terminate,
    Disconnect,
    ExceptionInfo,
    LoadedSources,
    Modules,
    Disassemble,
}

impl Operation {
    /// Wire name of the DAP command behind this operation
    pub fn command(&self) -> &'static str {
        match self {
            Operation::Start => "initialize",
            Operation::Launch => "launch",
            Operation::Attach => "attach",
            Operation::SetBreakpoints => "setBreakpoints",
            Operation::SetFunctionBreakpoints => "setFunctionBreakpoints",
            Operation::ConfigurationDone => "configurationDone",
            Operation::Continue => "continue",
            Operation::Next => "next",
            Operation::StepIn => "stepIn",
            Operation::StepOut => "stepOut",
            Operation::Pause => "pause",
            Operation::Threads => "threads",
            Operation::StackTrace => "stackTrace",
            Operation::Scopes => "scopes",
            Operation::Variables => "variables",
            Operation::Evaluate => "evaluate",
            Operation::SetVariable => "setVariable",
            Operation::Restart => "restart",
            Operation::Terminate => "terminate",
            Operation::Disconnect => "disconnect",
            Operation::ExceptionInfo => "exceptionInfo",
            Operation::LoadedSources => "loadedSources",
            Operation::Modules => "modules",
            Operation::Disassemble => "disassemble",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Start => f.write_str("start"),
            other => f.write_str(other.command()),
        }
    }
}

impl SessionState {
    /// Whether `operation` may be issued in this state
    pub fn allows(&self, operation: Operation) -> bool {
        use Operation::*;
        use SessionState::*;

        match operation {
            Start => matches!(self, Idle | Terminated | Disconnected),
            Launch | Attach => matches!(self, Initializing),
            ConfigurationDone => matches!(self, Configuring),
            SetBreakpoints | SetFunctionBreakpoints => {
                matches!(self, Configuring | Running | Stopped)
            }
            Continue | Next | StepIn | StepOut => matches!(self, Configuring | Stopped),
            Pause => matches!(self, Running),
            Threads | StackTrace | Scopes | Variables | Evaluate | SetVariable | ExceptionInfo => {
                matches!(self, Configuring | Stopped)
            }
            LoadedSources | Modules | Disassemble => {
                matches!(self, Initializing | Configuring | Running | Stopped)
            }
            Restart => matches!(self, Configuring | Running | Stopped | Terminated),
            Terminate | Disconnect => {
                matches!(self, Initializing | Configuring | Running | Stopped | Terminated)
            }
        }
    }

    /// Whether the session holds a live connection in this state
    pub fn is_live(&self) -> bool {
        !matches!(
            self,
            SessionState::Idle | SessionState::Terminated | SessionState::Disconnected
        )
    }
}
