use std::io;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{program} not found in PATH")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("spawning {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "timed out after {timeout:?} waiting for server readiness (expected '{ready_line}')\nCollected output:\n{output}"
    )]
    StartupTimeout {
        timeout: Duration,
        ready_line: String,
        output: String,
    },

    #[error("server readiness detection failed: {status}\nCollected output:\n{output}")]
    ExitedBeforeReady { status: String, output: String },

    #[error("could not terminate server process")]
    Kill(#[source] io::Error),
}
