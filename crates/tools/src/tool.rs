use std::fmt;
use std::str::FromStr;

use crate::ToolError;

/// Every tool the bridge exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    StartDebugger,
    StopDebugger,
    DebugProgram,
    ExecProgram,
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

impl Tool {
    pub const ALL: [Tool; 26] = [
        Tool::StartDebugger,
        Tool::StopDebugger,
        Tool::DebugProgram,
        Tool::ExecProgram,
        Tool::Attach,
        Tool::SetBreakpoints,
        Tool::SetFunctionBreakpoints,
        Tool::ConfigurationDone,
        Tool::Continue,
        Tool::Next,
        Tool::StepIn,
        Tool::StepOut,
        Tool::Pause,
        Tool::Threads,
        Tool::StackTrace,
        Tool::Scopes,
        Tool::Variables,
        Tool::Evaluate,
        Tool::SetVariable,
        Tool::Restart,
        Tool::Terminate,
        Tool::Disconnect,
        Tool::ExceptionInfo,
        Tool::LoadedSources,
        Tool::Modules,
        Tool::Disassemble,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::StartDebugger => "start-debugger",
            Tool::StopDebugger => "stop-debugger",
            Tool::DebugProgram => "debug-program",
            Tool::ExecProgram => "exec-program",
            Tool::Attach => "attach",
            Tool::SetBreakpoints => "set-breakpoints",
            Tool::SetFunctionBreakpoints => "set-function-breakpoints",
            Tool::ConfigurationDone => "configuration-done",
            Tool::Continue => "continue",
            Tool::Next => "next",
            Tool::StepIn => "step-in",
            Tool::StepOut => "step-out",
            Tool::Pause => "pause",
            Tool::Threads => "threads",
            Tool::StackTrace => "stack-trace",
            Tool::Scopes => "scopes",
            Tool::Variables => "variables",
            Tool::Evaluate => "evaluate",
            Tool::SetVariable => "set-variable",
            Tool::Restart => "restart",
            Tool::Terminate => "terminate",
            Tool::Disconnect => "disconnect",
            Tool::ExceptionInfo => "exception-info",
            Tool::LoadedSources => "loaded-sources",
            Tool::Modules => "modules",
            Tool::Disassemble => "disassemble",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::StartDebugger => {
                "Starts a debugger exposed via a DAP server. You can provide the port you would like the debugger DAP server to listen on."
            }
            Tool::StopDebugger => "Stops an already running debugger.",
            Tool::DebugProgram => "Tells the debugger running via DAP to debug a local program.",
            Tool::ExecProgram => {
                "Tells the debugger running via DAP to debug a local program that has already been compiled. The path to the program must be an absolute path, or the program must be in $PATH."
            }
            Tool::Attach => "Attaches the debugger to a running process.",
            Tool::SetBreakpoints => "Sets breakpoints in a source file at specified line numbers.",
            Tool::SetFunctionBreakpoints => "Sets breakpoints on functions by name.",
            Tool::ConfigurationDone => {
                "Indicates that the configuration phase is complete and debugging can begin."
            }
            Tool::Continue => "Continues execution of the debugged program.",
            Tool::Next => "Steps over the next line of code.",
            Tool::StepIn => "Steps into a function call.",
            Tool::StepOut => "Steps out of the current function.",
            Tool::Pause => "Pauses execution of a thread.",
            Tool::Threads => "Lists all threads in the debugged program.",
            Tool::StackTrace => "Gets the stack trace for a thread.",
            Tool::Scopes => "Gets the scopes for a stack frame, with the variables of each scope.",
            Tool::Variables => "Gets variables in a scope.",
            Tool::Evaluate => "Evaluates an expression in the context of a stack frame.",
            Tool::SetVariable => "Sets the value of a variable in the debugged program.",
            Tool::Restart => "Restarts the debugging session.",
            Tool::Terminate => "Terminates the debuggee process.",
            Tool::Disconnect => "Disconnects from the debugger.",
            Tool::ExceptionInfo => "Gets information about an exception in a thread.",
            Tool::LoadedSources => "Gets the list of all loaded source files.",
            Tool::Modules => "Gets the list of all loaded modules.",
            Tool::Disassemble => "Disassembles code at a memory reference.",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.name() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}
