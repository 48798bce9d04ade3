use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use server::{DebugServer, ServerCommand, ServerError};
use transport::events::{Event, EventKind, StoppedEventBody};
use transport::requests::{AttachMode, Initialize, Launch, LaunchMode};
use transport::responses::{
    Capabilities, DisassembleResponse, EvaluateResponse, ExceptionInfoResponse,
    LoadedSourcesResponse, ModulesResponse, ScopesResponse, SetBreakpointsResponse,
    SetVariableResponse, StackTraceResponse, ThreadsResponse, VariablesResponse,
};
use transport::types::{
    Breakpoint, BreakpointId, DisassembledInstruction, Scope, Seq, Source, StackFrameId, Thread,
    ThreadId, Variable, VariablesReference,
};
use transport::{Connection, DapTransport};

use crate::correlator::{Completed, Completion};
use crate::{Operation, SessionError, SessionState};

/// Number of events kept in [`Session::recent_events`]
pub const RECENT_EVENTS: usize = 64;

/// Frames fetched when a stack trace asks for zero levels
const DEFAULT_STACK_LEVELS: i64 = 20;

/// Cap on buffered debuggee output between calls to [`Session::take_output`]
const MAX_BUFFERED_OUTPUT: usize = 64 * 1024;

/// How to bring up a debugger for [`Session::start`]
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub server: ServerCommand,
    /// `host:port` the debugger listens on
    pub address: String,
    /// Give up on plain request/response waits after this long
    pub response_timeout: Option<Duration>,
}

/// Why and where the debuggee stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopInfo {
    pub reason: String,
    pub thread_id: Option<ThreadId>,
    pub hit_breakpoint_ids: Vec<BreakpointId>,
    pub description: Option<String>,
    pub text: Option<String>,
    pub all_threads_stopped: bool,
}

impl From<StoppedEventBody> for StopInfo {
    fn from(body: StoppedEventBody) -> Self {
        Self {
            reason: body.reason,
            thread_id: body.thread_id,
            hit_breakpoint_ids: body.hit_breakpoint_ids.unwrap_or_default(),
            description: body.description,
            text: body.text,
            all_threads_stopped: body.all_threads_stopped.unwrap_or(false),
        }
    }
}

impl StopInfo {
    pub fn is_breakpoint(&self) -> bool {
        matches!(self.reason.as_str(), "breakpoint" | "function breakpoint")
    }
}

impl fmt::Display for StopInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.thread_id, self.hit_breakpoint_ids.first()) {
            (Some(thread), Some(id)) if self.is_breakpoint() => write!(
                f,
                "Program stopped as a result of hitting breakpoint {id} hit by thread {thread}"
            ),
            (Some(thread), _) => write!(
                f,
                "Program stopped (reason: {}) in thread {thread}",
                self.reason
            ),
            (None, _) => f.write_str("Program stopped for unknown reason."),
        }
    }
}

/// How an execution-control request finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Stopped(StopInfo),
    /// The debuggee ran to completion
    Terminated,
}

/// How a restart or terminate request finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Completed,
    /// A `terminated` event arrived before the response
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NothingRunning,
}

/// The single debug session
///
/// Sequence numbers start at 1 and are never reused for the lifetime of this
/// value, including across [`Session::stop`] and a later [`Session::start`].
pub struct Session {
    pub(crate) connection: Option<Connection>,
    server: Option<DebugServer>,
    pub(crate) next_seq: Seq,
    /// Requests written but not yet answered
    pub(crate) outstanding: BTreeSet<Seq>,
    state: SessionState,
    pub(crate) response_timeout: Option<Duration>,
    capabilities: Option<Capabilities>,
    launched: Option<Launch>,
    attached: bool,
    /// Whether the debuggee stays halted once configuration is done
    halt_on_configured: bool,
    last_stop: Option<StopInfo>,
    exit_code: Option<i64>,
    recent_events: VecDeque<Event>,
    output: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("next_seq", &self.next_seq)
            .field("outstanding", &self.outstanding)
            .field("connected", &self.connection.is_some())
            .field("server", &self.server.as_ref().map(|s| s.pid()))
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            connection: None,
            server: None,
            next_seq: 1,
            outstanding: BTreeSet::new(),
            state: SessionState::Idle,
            response_timeout: None,
            capabilities: None,
            launched: None,
            attached: false,
            halt_on_configured: false,
            last_stop: None,
            exit_code: None,
            recent_events: VecDeque::with_capacity(RECENT_EVENTS),
            output: String::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Sequence number the next request will carry
    pub fn next_seq(&self) -> Seq {
        self.next_seq
    }

    /// Number of requests written but not yet answered
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Capabilities reported by the adapter during the handshake
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.capabilities.as_ref()
    }

    pub fn last_stop(&self) -> Option<&StopInfo> {
        self.last_stop.as_ref()
    }

    /// Exit code of the debuggee, once an `exited` event was seen
    pub fn exit_code(&self) -> Option<i64> {
        self.exit_code
    }

    /// The most recent events, oldest first
    pub fn recent_events(&self) -> impl Iterator<Item = &Event> {
        self.recent_events.iter()
    }

    /// Debuggee output collected from `output` events since the last call
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Bound plain request/response waits; `None` waits forever
    pub fn set_response_timeout(&mut self, timeout: Option<Duration>) {
        self.response_timeout = timeout;
    }

    pub fn has_server(&self) -> bool {
        self.server.is_some()
    }

    /// Spawn the debugger, connect to it and perform the initialize handshake
    #[tracing::instrument(skip(self, options), fields(address = %options.address))]
    pub fn start(&mut self, options: &StartOptions) -> Result<Capabilities, SessionError> {
        self.prepare_start()?;
        self.response_timeout = options.response_timeout;

        let server = DebugServer::spawn(&options.server, &options.address).map_err(|e| match e {
            ServerError::StartupTimeout { .. } | ServerError::ExitedBeforeReady { .. } => {
                SessionError::StartupTimeout(e)
            }
            other => SessionError::Server(other),
        })?;
        self.server = Some(server);
        self.state = SessionState::Initializing;

        let connection = match Connection::open(options.address.as_str()) {
            Ok(connection) => connection,
            Err(e) => {
                self.teardown();
                return Err(SessionError::Connection(e));
            }
        };
        self.handshake(connection)
    }

    /// Perform the initialize handshake over an already established transport
    ///
    /// No debugger process is owned by the session in this case.
    #[tracing::instrument(skip(self, transport))]
    pub fn start_with_transport<T>(&mut self, transport: T) -> Result<Capabilities, SessionError>
    where
        T: DapTransport,
    {
        self.prepare_start()?;
        let connection = Connection::with_transport(transport).map_err(SessionError::Connection)?;
        self.state = SessionState::Initializing;
        self.handshake(connection)
    }

    fn prepare_start(&mut self) -> Result<(), SessionError> {
        if !self.state.allows(Operation::Start) {
            return Err(SessionError::InvalidState {
                operation: Operation::Start,
                state: self.state,
            });
        }
        if self.state != SessionState::Idle {
            tracing::debug!(state = %self.state, "cleaning up previous session");
            self.teardown();
        }
        Ok(())
    }

    fn handshake(&mut self, connection: Connection) -> Result<Capabilities, SessionError> {
        self.connection = Some(connection);
        let result = self
            .send_initialize(Initialize::default())
            .and_then(|seq| self.response_body::<Capabilities>(seq));
        match result {
            Ok(capabilities) => {
                tracing::debug!(?capabilities, "debugger initialized");
                self.capabilities = Some(capabilities.clone());
                Ok(capabilities)
            }
            Err(e) => {
                self.teardown();
                Err(e)
            }
        }
    }

    /// Close the connection and kill the debugger
    ///
    /// Returns [`StopOutcome::NothingRunning`] when there was nothing to stop.
    #[tracing::instrument(skip(self))]
    pub fn stop(&mut self) -> Result<StopOutcome, SessionError> {
        if self.connection.is_none() && self.server.is_none() {
            self.teardown();
            return Ok(StopOutcome::NothingRunning);
        }
        self.reset().map_err(SessionError::Server)?;
        Ok(StopOutcome::Stopped)
    }

    /// Tear everything down and return to [`SessionState::Idle`], keeping the
    /// sequence counter
    fn reset(&mut self) -> Result<(), ServerError> {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
        let killed = match self.server.take() {
            Some(mut server) => server.kill(),
            None => Ok(()),
        };
        self.state = SessionState::Idle;
        self.outstanding.clear();
        self.capabilities = None;
        self.launched = None;
        self.attached = false;
        self.halt_on_configured = false;
        self.last_stop = None;
        self.exit_code = None;
        self.recent_events.clear();
        self.output.clear();
        killed
    }

    fn teardown(&mut self) {
        if let Err(e) = self.reset() {
            tracing::warn!(error = %e, "could not stop debugger");
        }
    }

    pub(crate) fn force_terminated(&mut self) {
        self.state = SessionState::Terminated;
        self.outstanding.clear();
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }

    /// An execution-control request was accepted
    pub(crate) fn resumed(&mut self) {
        if self.state != SessionState::Terminated {
            self.state = SessionState::Running;
        }
    }

    /// Record an event and apply it to the lifecycle
    pub(crate) fn observe(&mut self, event: Event) -> EventKind {
        let kind = event.kind();
        match &kind {
            EventKind::Stopped(body) => {
                if self.state != SessionState::Terminated {
                    self.state = SessionState::Stopped;
                }
                self.last_stop = Some(StopInfo::from(body.clone()));
            }
            EventKind::Continued(_) => {
                if self.state == SessionState::Stopped {
                    self.state = SessionState::Running;
                }
            }
            EventKind::Terminated => self.state = SessionState::Terminated,
            EventKind::Exited(body) => self.exit_code = body.exit_code,
            EventKind::Output(body) => {
                if self.output.len() + body.output.len() <= MAX_BUFFERED_OUTPUT {
                    self.output.push_str(&body.output);
                } else {
                    tracing::debug!("output buffer full, dropping debuggee output");
                }
            }
            _ => {}
        }

        if self.recent_events.len() == RECENT_EVENTS {
            self.recent_events.pop_front();
        }
        self.recent_events.push_back(event);
        kind
    }

    fn require(&self, operation: Operation) -> Result<(), SessionError> {
        if self.state == SessionState::Idle || self.connection.is_none() {
            return Err(SessionError::NotConnected);
        }
        if !self.state.allows(operation) {
            return Err(SessionError::InvalidState {
                operation,
                state: self.state,
            });
        }
        if let Some(capabilities) = &self.capabilities
            && capabilities.supports(operation.command()) == Some(false)
        {
            tracing::warn!(%operation, "debugger did not advertise support for this request");
        }
        Ok(())
    }

    fn response_body<T>(&mut self, seq: Seq) -> Result<T, SessionError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.await_response(seq)?;
        response
            .body_as()
            .map_err(|source| SessionError::InvalidResponseBody {
                command: response.command.clone(),
                source,
            })
    }

    fn execute(&mut self, seq: Seq) -> Result<ExecutionOutcome, SessionError> {
        match self.await_completion(seq, Completion::ExecutionStop)? {
            Completed::Stopped(stop) => Ok(ExecutionOutcome::Stopped(stop)),
            Completed::Terminated => Ok(ExecutionOutcome::Terminated),
            Completed::Response(_) => unreachable!("execution waits complete with an event"),
        }
    }

    /// Launch `program` halted at its entry point
    #[tracing::instrument(skip(self))]
    pub fn launch(
        &mut self,
        mode: LaunchMode,
        program: &Path,
        args: Option<Vec<String>>,
    ) -> Result<(), SessionError> {
        self.require(Operation::Launch)?;
        let mut launch = Launch::new(mode, program);
        launch.args = args;
        let seq = self.send_launch(launch.clone())?;
        self.await_response(seq)?;
        self.halt_on_configured = launch.stop_on_entry;
        self.launched = Some(launch);
        self.attached = false;
        if self.state == SessionState::Initializing {
            self.state = SessionState::Configuring;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn attach(&mut self, mode: AttachMode, process_id: i64) -> Result<(), SessionError> {
        self.require(Operation::Attach)?;
        let seq = self.send_attach(mode, process_id)?;
        self.await_response(seq)?;
        self.launched = None;
        self.attached = true;
        self.halt_on_configured = false;
        if self.state == SessionState::Initializing {
            self.state = SessionState::Configuring;
        }
        Ok(())
    }

    /// Replace the line breakpoints of `file`; an empty `lines` clears them
    #[tracing::instrument(skip(self))]
    pub fn set_breakpoints(
        &mut self,
        file: &Path,
        lines: &[i64],
    ) -> Result<Vec<Breakpoint>, SessionError> {
        self.require(Operation::SetBreakpoints)?;
        let seq = self.send_set_breakpoints(file, lines)?;
        let body: SetBreakpointsResponse = self.response_body(seq)?;
        Ok(body.breakpoints)
    }

    #[tracing::instrument(skip(self))]
    pub fn set_function_breakpoints(
        &mut self,
        names: &[String],
    ) -> Result<Vec<Breakpoint>, SessionError> {
        self.require(Operation::SetFunctionBreakpoints)?;
        let seq = self.send_set_function_breakpoints(names)?;
        let body: SetBreakpointsResponse = self.response_body(seq)?;
        Ok(body.breakpoints)
    }

    /// Finish configuration
    ///
    /// A debuggee launched with `stopOnEntry` stays halted at its entry point,
    /// so the session moves to [`SessionState::Stopped`]; otherwise it is
    /// running.
    #[tracing::instrument(skip(self))]
    pub fn configuration_done(&mut self) -> Result<(), SessionError> {
        self.require(Operation::ConfigurationDone)?;
        let seq = self.send_configuration_done()?;
        self.await_response(seq)?;
        if self.state == SessionState::Configuring {
            self.state = if self.halt_on_configured {
                SessionState::Stopped
            } else {
                SessionState::Running
            };
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn r#continue(&mut self, thread_id: ThreadId) -> Result<ExecutionOutcome, SessionError> {
        self.require(Operation::Continue)?;
        let seq = self.send_continue(thread_id)?;
        self.execute(seq)
    }

    #[tracing::instrument(skip(self))]
    pub fn next(&mut self, thread_id: ThreadId) -> Result<ExecutionOutcome, SessionError> {
        self.require(Operation::Next)?;
        let seq = self.send_next(thread_id)?;
        self.execute(seq)
    }

    #[tracing::instrument(skip(self))]
    pub fn step_in(&mut self, thread_id: ThreadId) -> Result<ExecutionOutcome, SessionError> {
        self.require(Operation::StepIn)?;
        let seq = self.send_step_in(thread_id)?;
        self.execute(seq)
    }

    #[tracing::instrument(skip(self))]
    pub fn step_out(&mut self, thread_id: ThreadId) -> Result<ExecutionOutcome, SessionError> {
        self.require(Operation::StepOut)?;
        let seq = self.send_step_out(thread_id)?;
        self.execute(seq)
    }

    #[tracing::instrument(skip(self))]
    pub fn pause(&mut self, thread_id: ThreadId) -> Result<ExecutionOutcome, SessionError> {
        self.require(Operation::Pause)?;
        let seq = self.send_pause(thread_id)?;
        self.execute(seq)
    }

    #[tracing::instrument(skip(self))]
    pub fn threads(&mut self) -> Result<Vec<Thread>, SessionError> {
        self.require(Operation::Threads)?;
        let seq = self.send_threads()?;
        let body: ThreadsResponse = self.response_body(seq)?;
        Ok(body.threads)
    }

    /// Fetch `levels` frames of `thread_id` starting at `start_frame`; zero
    /// levels means the default depth
    #[tracing::instrument(skip(self))]
    pub fn stack_trace(
        &mut self,
        thread_id: ThreadId,
        start_frame: i64,
        levels: i64,
    ) -> Result<StackTraceResponse, SessionError> {
        self.require(Operation::StackTrace)?;
        let levels = if levels <= 0 {
            DEFAULT_STACK_LEVELS
        } else {
            levels
        };
        let seq = self.send_stack_trace(thread_id, start_frame.max(0), levels)?;
        self.response_body(seq)
    }

    #[tracing::instrument(skip(self))]
    pub fn scopes(&mut self, frame_id: StackFrameId) -> Result<Vec<Scope>, SessionError> {
        self.require(Operation::Scopes)?;
        let seq = self.send_scopes(frame_id)?;
        let body: ScopesResponse = self.response_body(seq)?;
        Ok(body.scopes)
    }

    #[tracing::instrument(skip(self))]
    pub fn variables(
        &mut self,
        variables_reference: VariablesReference,
    ) -> Result<Vec<Variable>, SessionError> {
        self.require(Operation::Variables)?;
        let seq = self.send_variables(variables_reference)?;
        let body: VariablesResponse = self.response_body(seq)?;
        Ok(body.variables)
    }

    /// Evaluate `expression`, in the `repl` context unless told otherwise
    #[tracing::instrument(skip(self))]
    pub fn evaluate(
        &mut self,
        expression: &str,
        frame_id: Option<StackFrameId>,
        context: Option<&str>,
    ) -> Result<EvaluateResponse, SessionError> {
        self.require(Operation::Evaluate)?;
        let context = context.filter(|c| !c.is_empty()).unwrap_or("repl");
        let seq = self.send_evaluate(expression, frame_id, context)?;
        self.response_body(seq)
    }

    #[tracing::instrument(skip(self))]
    pub fn set_variable(
        &mut self,
        variables_reference: VariablesReference,
        name: &str,
        value: &str,
    ) -> Result<SetVariableResponse, SessionError> {
        self.require(Operation::SetVariable)?;
        let seq = self.send_set_variable(variables_reference, name, value)?;
        self.response_body(seq)
    }

    /// Relaunch the debuggee over the existing connection
    ///
    /// Uses the program and mode of the previous launch, with `args`
    /// replacing its arguments when given.
    #[tracing::instrument(skip(self))]
    pub fn restart(&mut self, args: Option<Vec<String>>) -> Result<RequestOutcome, SessionError> {
        self.require(Operation::Restart)?;
        let Some(original) = self.launched.as_ref().filter(|_| !self.attached) else {
            return Err(SessionError::InvalidState {
                operation: Operation::Restart,
                state: self.state,
            });
        };
        let mut relaunch = original.clone();
        relaunch.stop_on_entry = false;
        if args.is_some() {
            relaunch.args = args;
        }

        let seq = self.send_restart(Some(relaunch))?;
        match self.await_completion(seq, Completion::ResponseOrTerminated)? {
            Completed::Response(_) => {
                self.last_stop = None;
                self.exit_code = None;
                self.halt_on_configured = false;
                self.state = SessionState::Configuring;
                Ok(RequestOutcome::Completed)
            }
            Completed::Terminated => Ok(RequestOutcome::Terminated),
            Completed::Stopped(_) => unreachable!("restart waits never complete on a stop"),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn terminate(&mut self) -> Result<RequestOutcome, SessionError> {
        self.require(Operation::Terminate)?;
        let seq = self.send_terminate()?;
        let outcome = match self.await_completion(seq, Completion::ResponseOrTerminated)? {
            Completed::Response(_) => RequestOutcome::Completed,
            Completed::Terminated => RequestOutcome::Terminated,
            Completed::Stopped(_) => unreachable!("terminate waits never complete on a stop"),
        };
        self.state = SessionState::Terminated;
        Ok(outcome)
    }

    /// Send `disconnect` and close the connection
    ///
    /// The adapter closing the stream right after (or instead of) answering
    /// is expected and not an error.
    #[tracing::instrument(skip(self))]
    pub fn disconnect(&mut self, terminate_debuggee: Option<bool>) -> Result<(), SessionError> {
        self.require(Operation::Disconnect)?;
        let seq = self.send_disconnect(terminate_debuggee)?;
        match self.await_response(seq) {
            Ok(_) => {}
            Err(SessionError::SessionLost(reason)) => {
                tracing::debug!(%reason, "debugger closed the connection on disconnect");
            }
            Err(e) => return Err(e),
        }
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
        self.outstanding.clear();
        self.state = SessionState::Disconnected;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn exception_info(
        &mut self,
        thread_id: ThreadId,
    ) -> Result<ExceptionInfoResponse, SessionError> {
        self.require(Operation::ExceptionInfo)?;
        let seq = self.send_exception_info(thread_id)?;
        self.response_body(seq)
    }

    #[tracing::instrument(skip(self))]
    pub fn loaded_sources(&mut self) -> Result<Vec<Source>, SessionError> {
        self.require(Operation::LoadedSources)?;
        let seq = self.send_loaded_sources()?;
        let body: LoadedSourcesResponse = self.response_body(seq)?;
        Ok(body.sources)
    }

    #[tracing::instrument(skip(self))]
    pub fn modules(
        &mut self,
        start_module: Option<i64>,
        module_count: Option<i64>,
    ) -> Result<ModulesResponse, SessionError> {
        self.require(Operation::Modules)?;
        let seq = self.send_modules(start_module, module_count)?;
        self.response_body(seq)
    }

    #[tracing::instrument(skip(self))]
    pub fn disassemble(
        &mut self,
        memory_reference: &str,
        instruction_offset: i64,
        instruction_count: i64,
    ) -> Result<Vec<DisassembledInstruction>, SessionError> {
        self.require(Operation::Disassemble)?;
        let seq = self.send_disassemble(memory_reference, instruction_offset, instruction_count)?;
        let body: DisassembleResponse = self.response_body(seq)?;
        Ok(body.instructions)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}
