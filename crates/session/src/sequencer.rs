//! One send operation per DAP command
//!
//! Each operation allocates the next sequence number, builds the typed
//! arguments and writes the request. None of them wait for the reply; that
//! is the job of [`crate::correlator`].
use std::path::Path;

use transport::requests::{
    self, Attach, AttachMode, Disassemble, Evaluate, Initialize, Launch, Request, RequestBody,
    SetBreakpoints, SetFunctionBreakpoints, SetVariable, StackTrace,
};
use transport::types::{
    FunctionBreakpoint, Seq, Source, SourceBreakpoint, StackFrameId, ThreadId, VariablesReference,
};
use transport::{CodecError, OutgoingMessage, TransportError};

use crate::{Session, SessionError};

impl Session {
    fn send(&mut self, body: RequestBody) -> Result<Seq, SessionError> {
        let connection = self.connection.as_mut().ok_or(SessionError::NotConnected)?;

        let seq = self.next_seq;
        self.next_seq += 1;
        let command = body.command();
        tracing::debug!(seq, command, "sending request");

        let message = OutgoingMessage::Request(Request { seq, body });
        match connection.send(&message) {
            Ok(()) => {
                self.outstanding.insert(seq);
                Ok(seq)
            }
            // nothing reached the wire, so the number is handed out again
            Err(TransportError::Codec(e @ CodecError::Encoding(_))) => {
                self.next_seq = seq;
                Err(SessionError::Encoding(e))
            }
            Err(TransportError::Closed) => {
                self.next_seq = seq;
                Err(SessionError::NotConnected)
            }
            Err(e) => {
                tracing::error!(error = %e, seq, command, "writing request failed");
                self.force_terminated();
                Err(SessionError::StreamClosed(e))
            }
        }
    }

    pub(crate) fn send_initialize(&mut self, arguments: Initialize) -> Result<Seq, SessionError> {
        self.send(RequestBody::Initialize(arguments))
    }

    pub(crate) fn send_launch(&mut self, launch: Launch) -> Result<Seq, SessionError> {
        if launch.program.as_os_str().is_empty() {
            return Err(SessionError::InvalidArguments(
                "launch requires a program path".to_string(),
            ));
        }
        self.send(RequestBody::Launch(launch))
    }

    pub(crate) fn send_attach(&mut self, mode: AttachMode, process_id: i64) -> Result<Seq, SessionError> {
        self.send(RequestBody::Attach(Attach {
            request: "attach".to_string(),
            mode,
            process_id,
        }))
    }

    /// An empty `lines` clears the breakpoints of `file`
    pub(crate) fn send_set_breakpoints(&mut self, file: &Path, lines: &[i64]) -> Result<Seq, SessionError> {
        if file.as_os_str().is_empty() {
            return Err(SessionError::InvalidArguments(
                "setting breakpoints requires a file path".to_string(),
            ));
        }
        self.send(RequestBody::SetBreakpoints(SetBreakpoints {
            source: Source::from_path(file),
            breakpoints: lines
                .iter()
                .map(|&line| SourceBreakpoint {
                    line,
                    ..Default::default()
                })
                .collect(),
            lines: lines.to_vec(),
        }))
    }

    pub(crate) fn send_set_function_breakpoints(&mut self, names: &[String]) -> Result<Seq, SessionError> {
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(SessionError::InvalidArguments(
                "function breakpoint names must not be empty".to_string(),
            ));
        }
        self.send(RequestBody::SetFunctionBreakpoints(SetFunctionBreakpoints {
            breakpoints: names
                .iter()
                .map(|name| FunctionBreakpoint {
                    name: name.clone(),
                    ..Default::default()
                })
                .collect(),
        }))
    }

    pub(crate) fn send_configuration_done(&mut self) -> Result<Seq, SessionError> {
        self.send(RequestBody::ConfigurationDone)
    }

    pub(crate) fn send_continue(&mut self, thread_id: ThreadId) -> Result<Seq, SessionError> {
        self.send(RequestBody::Continue(requests::Continue { thread_id }))
    }

    pub(crate) fn send_next(&mut self, thread_id: ThreadId) -> Result<Seq, SessionError> {
        self.send(RequestBody::Next(requests::Next { thread_id }))
    }

    pub(crate) fn send_step_in(&mut self, thread_id: ThreadId) -> Result<Seq, SessionError> {
        self.send(RequestBody::StepIn(requests::StepIn { thread_id }))
    }

    pub(crate) fn send_step_out(&mut self, thread_id: ThreadId) -> Result<Seq, SessionError> {
        self.send(RequestBody::StepOut(requests::StepOut { thread_id }))
    }

    pub(crate) fn send_pause(&mut self, thread_id: ThreadId) -> Result<Seq, SessionError> {
        self.send(RequestBody::Pause(requests::Pause { thread_id }))
    }

    pub(crate) fn send_threads(&mut self) -> Result<Seq, SessionError> {
        self.send(RequestBody::Threads)
    }

    pub(crate) fn send_stack_trace(
        &mut self,
        thread_id: ThreadId,
        start_frame: i64,
        levels: i64,
    ) -> Result<Seq, SessionError> {
        self.send(RequestBody::StackTrace(StackTrace {
            thread_id,
            start_frame,
            levels,
        }))
    }

    pub(crate) fn send_scopes(&mut self, frame_id: StackFrameId) -> Result<Seq, SessionError> {
        self.send(RequestBody::Scopes(requests::Scopes { frame_id }))
    }

    pub(crate) fn send_variables(&mut self, variables_reference: VariablesReference) -> Result<Seq, SessionError> {
        self.send(RequestBody::Variables(requests::Variables {
            variables_reference,
        }))
    }

    pub(crate) fn send_evaluate(
        &mut self,
        expression: &str,
        frame_id: Option<StackFrameId>,
        context: &str,
    ) -> Result<Seq, SessionError> {
        if expression.trim().is_empty() {
            return Err(SessionError::InvalidArguments(
                "evaluate requires an expression".to_string(),
            ));
        }
        self.send(RequestBody::Evaluate(Evaluate {
            expression: expression.to_string(),
            frame_id,
            context: context.to_string(),
        }))
    }

    pub(crate) fn send_set_variable(
        &mut self,
        variables_reference: VariablesReference,
        name: &str,
        value: &str,
    ) -> Result<Seq, SessionError> {
        if name.is_empty() {
            return Err(SessionError::InvalidArguments(
                "setVariable requires a variable name".to_string(),
            ));
        }
        self.send(RequestBody::SetVariable(SetVariable {
            variables_reference,
            name: name.to_string(),
            value: value.to_string(),
        }))
    }

    pub(crate) fn send_restart(&mut self, arguments: Option<Launch>) -> Result<Seq, SessionError> {
        self.send(RequestBody::Restart(requests::Restart { arguments }))
    }

    pub(crate) fn send_terminate(&mut self) -> Result<Seq, SessionError> {
        self.send(RequestBody::Terminate(requests::Terminate::default()))
    }

    pub(crate) fn send_disconnect(&mut self, terminate_debuggee: Option<bool>) -> Result<Seq, SessionError> {
        self.send(RequestBody::Disconnect(requests::Disconnect { terminate_debuggee }))
    }

    pub(crate) fn send_exception_info(&mut self, thread_id: ThreadId) -> Result<Seq, SessionError> {
        self.send(RequestBody::ExceptionInfo(requests::ExceptionInfo { thread_id }))
    }

    pub(crate) fn send_loaded_sources(&mut self) -> Result<Seq, SessionError> {
        self.send(RequestBody::LoadedSources)
    }

    pub(crate) fn send_modules(
        &mut self,
        start_module: Option<i64>,
        module_count: Option<i64>,
    ) -> Result<Seq, SessionError> {
        self.send(RequestBody::Modules(requests::Modules {
            start_module,
            module_count,
        }))
    }

    pub(crate) fn send_disassemble(
        &mut self,
        memory_reference: &str,
        instruction_offset: i64,
        instruction_count: i64,
    ) -> Result<Seq, SessionError> {
        if memory_reference.trim().is_empty() {
            return Err(SessionError::InvalidArguments(
                "disassemble requires a memory reference".to_string(),
            ));
        }
        if instruction_count <= 0 {
            return Err(SessionError::InvalidArguments(
                "instruction count must be positive".to_string(),
            ));
        }
        self.send(RequestBody::Disassemble(Disassemble {
            memory_reference: memory_reference.to_string(),
            instruction_offset,
            instruction_count,
            resolve_symbols: true,
        }))
    }
}
