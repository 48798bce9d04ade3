//! Text rendering of tool results
use std::fmt::Write;

use session::ExecutionOutcome;
use transport::responses::{
    Capabilities, EvaluateResponse, ExceptionInfoResponse, ModulesResponse, SetVariableResponse,
    StackTraceResponse,
};
use transport::types::{Breakpoint, DisassembledInstruction, Scope, Source, Thread, Variable};

pub fn started(address: &str, capabilities: &Capabilities) -> String {
    let capabilities = serde_json::to_string_pretty(capabilities)
        .unwrap_or_else(|e| format!("<could not render capabilities: {e}>"));
    format!("Started debugger at: {address}\n\nServer Capabilities:\n{capabilities}")
}

pub fn breakpoints(breakpoints: &[Breakpoint]) -> String {
    if breakpoints.is_empty() {
        return "No breakpoints set".to_string();
    }
    let mut out = String::new();
    for bp in breakpoints {
        if !out.is_empty() {
            out.push('\n');
        }
        if bp.verified {
            let path = bp
                .source
                .as_ref()
                .and_then(|s| s.path.as_ref())
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            let _ = write!(
                out,
                "Breakpoint created at {path}:{} with ID {}",
                bp.line.unwrap_or_default(),
                bp.id.unwrap_or_default()
            );
        } else {
            let _ = write!(
                out,
                "Breakpoint unable to be created: {}",
                bp.message.as_deref().unwrap_or("no reason given")
            );
        }
    }
    out
}

pub fn function_breakpoints(breakpoints: &[Breakpoint]) -> String {
    let verified = breakpoints.iter().filter(|bp| bp.verified).count();
    format!(
        "Set breakpoints on {} functions ({verified} verified)",
        breakpoints.len()
    )
}

/// Result of an execution-control tool; `action` describes what was asked for
pub fn execution(action: &str, outcome: &ExecutionOutcome, output: &str) -> String {
    let mut out = match outcome {
        ExecutionOutcome::Stopped(stop) => format!("{action}...\n{stop}"),
        ExecutionOutcome::Terminated => format!("{action} to program termination"),
    };
    if !output.is_empty() {
        let _ = write!(out, "\n\nProgram output:\n{}", output.trim_end());
    }
    out
}

pub fn paused(outcome: &ExecutionOutcome) -> String {
    match outcome {
        ExecutionOutcome::Stopped(stop) => format!("Paused execution\n{stop}"),
        ExecutionOutcome::Terminated => "Program terminated before it could be paused".to_string(),
    }
}

pub fn threads(threads: &[Thread]) -> String {
    let mut out = String::from("Threads:");
    for thread in threads {
        let _ = write!(out, "\n  {} {}", thread.id, thread.name);
    }
    if threads.is_empty() {
        out.push_str("\n  (none)");
    }
    out
}

pub fn stack_trace(thread_id: i64, trace: &StackTraceResponse) -> String {
    let mut out = format!("Stack trace for thread {thread_id}:\n");
    for (i, frame) in trace.stack_frames.iter().enumerate() {
        let _ = write!(out, "\n#{i} (Frame ID: {}) {}", frame.id, frame.name);
        if let Some(path) = frame.source.as_ref().and_then(|s| s.path.as_ref()) {
            let _ = write!(out, "\n   at {}:{}", path.display(), frame.line);
            if frame.column > 0 {
                let _ = write!(out, ":{}", frame.column);
            }
        }
        if frame.presentation_hint.as_deref() == Some("subtle") {
            out.push_str(" (runtime)");
        }
        out.push('\n');
    }
    let total = trace
        .total_frames
        .unwrap_or(trace.stack_frames.len() as i64);
    let _ = write!(out, "\nTotal frames: {total}");
    out
}

/// Scopes of a frame, each followed by its variables when they could be
/// fetched
pub fn scopes(frame_id: i64, scopes: &[(Scope, Option<Vec<Variable>>)]) -> String {
    let mut out = format!("Scopes for frame {frame_id}:\n");
    for (scope, variables) in scopes {
        let _ = write!(out, "\n{} (ref: {}", scope.name, scope.variables_reference);
        if scope.expensive {
            out.push_str(", expensive");
        }
        out.push_str(")\n");
        for variable in variables.iter().flatten() {
            out.push_str("  ");
            push_variable(&mut out, variable);
        }
    }
    out
}

pub fn variables(variables_reference: i64, variables: &[Variable]) -> String {
    let mut out = format!("Variables for reference {variables_reference}:\n");
    for variable in variables {
        out.push_str("  ");
        push_variable(&mut out, variable);
    }
    out
}

fn push_variable(out: &mut String, variable: &Variable) {
    out.push_str(&variable.name);
    if let Some(ty) = variable.r#type.as_deref().filter(|t| !t.is_empty()) {
        let _ = write!(out, " ({ty})");
    }
    let _ = write!(out, " = {}", variable.value);
    if variable.variables_reference > 0 {
        let _ = write!(out, " [ref: {}]", variable.variables_reference);
    }
    out.push('\n');
}

pub fn evaluate(result: &EvaluateResponse) -> String {
    match result.r#type.as_deref().filter(|t| !t.is_empty()) {
        Some(ty) => format!("{} (type: {ty})", result.result),
        None => result.result.clone(),
    }
}

pub fn set_variable(name: &str, result: &SetVariableResponse) -> String {
    format!("Set variable {name} to {}", result.value)
}

pub fn exception_info(thread_id: i64, info: &ExceptionInfoResponse) -> String {
    let mut out = format!(
        "Exception in thread {thread_id}: {} (break mode: {})",
        info.exception_id, info.break_mode
    );
    if let Some(description) = &info.description {
        let _ = write!(out, "\n{description}");
    }
    if let Some(trace) = info.details.as_ref().and_then(|d| d.stack_trace.as_deref()) {
        let _ = write!(out, "\n\n{trace}");
    }
    out
}

pub fn loaded_sources(sources: &[Source]) -> String {
    let mut out = format!("Loaded sources ({}):", sources.len());
    for source in sources {
        let label = source
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .or_else(|| source.name.clone())
            .unwrap_or_else(|| "<unnamed>".to_string());
        let _ = write!(out, "\n  {label}");
    }
    out
}

pub fn modules(modules: &ModulesResponse) -> String {
    let total = modules
        .total_modules
        .unwrap_or(modules.modules.len() as i64);
    let mut out = format!("Modules ({total}):");
    for module in &modules.modules {
        let _ = write!(out, "\n  {} {}", module.id, module.name);
        if let Some(path) = &module.path {
            let _ = write!(out, " ({})", path.display());
        }
    }
    out
}

pub fn disassemble(instructions: &[DisassembledInstruction]) -> String {
    let mut out = String::from("Disassembly:");
    for instruction in instructions {
        let _ = write!(out, "\n  {}  {}", instruction.address, instruction.instruction);
        if let Some(symbol) = &instruction.symbol {
            let _ = write!(out, "  ; {symbol}");
        }
    }
    out
}
