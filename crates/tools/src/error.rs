use session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool {0:?}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("no port given and no default port configured")]
    MissingPort,

    #[error("invalid attach mode {0:?}, expected \"local\" or \"remote\"")]
    InvalidAttachMode(String),

    #[error("{context}: {source}")]
    Session {
        context: &'static str,
        #[source]
        source: SessionError,
    },
}

impl ToolError {
    pub fn session_error(&self) -> Option<&SessionError> {
        match self {
            ToolError::Session { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Attach the failing tool's description to a [`SessionError`]
pub(crate) trait SessionContext<T> {
    fn context(self, context: &'static str) -> Result<T, ToolError>;
}

impl<T> SessionContext<T> for Result<T, SessionError> {
    fn context(self, context: &'static str) -> Result<T, ToolError> {
        self.map_err(|source| ToolError::Session { context, source })
    }
}
