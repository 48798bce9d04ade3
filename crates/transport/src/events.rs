//! Events emitted by a DAP server
//!
//! Events are kept in their raw form on the wire so that an unknown event, or
//! a known event with an unexpected body, never breaks correlation. Use
//! [`Event::kind`] to get the typed view.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{BreakpointId, Module, Seq, Source, ThreadId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    #[serde(default)]
    pub seq: Seq,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EventKind {
    Initialized,
    Output(OutputEventBody),
    Process(ProcessEventBody),
    Stopped(StoppedEventBody),
    Continued(ContinuedEventBody),
    Thread(ThreadEventBody),
    Exited(ExitedEventBody),
    Terminated,
    Module(ModuleEventBody),
    /// Any event the bridge does not interpret, or whose body could not be
    /// decoded
    Other(String),
}

impl Event {
    pub fn new(event: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            seq: 0,
            event: event.into(),
            body,
        }
    }

    /// Typed view of this event
    pub fn kind(&self) -> EventKind {
        match self.event.as_str() {
            "initialized" => EventKind::Initialized,
            "terminated" => EventKind::Terminated,
            "output" => self.decode(EventKind::Output),
            "process" => self.decode(EventKind::Process),
            "stopped" => self.decode(EventKind::Stopped),
            "continued" => self.decode(EventKind::Continued),
            "thread" => self.decode(EventKind::Thread),
            "exited" => self.decode(EventKind::Exited),
            "module" => self.decode(EventKind::Module),
            other => {
                tracing::debug!(event = other, "received unknown event");
                EventKind::Other(other.to_string())
            }
        }
    }

    fn decode<T, F>(&self, wrap: F) -> EventKind
    where
        T: for<'de> Deserialize<'de>,
        F: FnOnce(T) -> EventKind,
    {
        let body = match &self.body {
            Some(Value::Null) | None => Value::Object(Default::default()),
            Some(body) => body.clone(),
        };
        match serde_json::from_value(body) {
            Ok(body) => wrap(body),
            Err(error) => {
                tracing::warn!(event = %self.event, %error, "could not decode event body");
                EventKind::Other(self.event.clone())
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputEventBody {
    pub category: Option<String>,
    #[serde(default)]
    pub output: String,
    pub variables_reference: Option<i64>,
    pub source: Option<Source>,
    pub line: Option<i64>,
    pub column: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    #[serde(default)]
    pub reason: String,
    pub thread_id: Option<ThreadId>,
    pub hit_breakpoint_ids: Option<Vec<BreakpointId>>,
    pub description: Option<String>,
    pub text: Option<String>,
    pub all_threads_stopped: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThreadEventBody {
    pub reason: String,
    pub thread_id: ThreadId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEventBody {
    pub name: String,
    pub system_process_id: Option<i64>,
    pub start_method: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExitedEventBody {
    pub exit_code: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContinuedEventBody {
    pub thread_id: Option<ThreadId>,
    pub all_threads_continued: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEventBody {
    pub reason: String,
    pub module: Module,
}
