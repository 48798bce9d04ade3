//! Debugger subprocess management
//!
//! The debugger is started as a child process listening on a TCP address. It
//! announces readiness by printing a known line on stdout; nothing may connect
//! before that line has been seen.
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

mod error;

pub use error::ServerError;

/// Default timeout for waiting for a server to become ready
pub const SERVER_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Placeholder in [`ServerCommand::args`] replaced by the listen address
pub const ADDRESS_PLACEHOLDER: &str = "{address}";

/// Number of stdout lines kept for error reports
const COLLECTED_LINES: usize = 50;

/// How to start a debugger that speaks DAP over TCP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: String,
    /// Arguments, with [`ADDRESS_PLACEHOLDER`] standing for `host:port`
    pub args: Vec<String>,
    /// Substring of the stdout line that signals the socket is listening
    pub ready_line: String,
    pub startup_timeout: Duration,
}

impl ServerCommand {
    /// `dlv dap --listen {address} --log --log-output dap`
    pub fn delve() -> Self {
        Self {
            program: "dlv".to_string(),
            args: ["dap", "--listen", ADDRESS_PLACEHOLDER, "--log", "--log-output", "dap"]
                .map(String::from)
                .to_vec(),
            ready_line: "DAP server listening at".to_string(),
            startup_timeout: SERVER_READY_TIMEOUT,
        }
    }

    fn args_for(&self, address: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(ADDRESS_PLACEHOLDER, address))
            .collect()
    }
}

/// A running debugger process
///
/// The process is killed when this value is dropped.
#[derive(Debug)]
pub struct DebugServer {
    child: Child,
    address: String,
    killed: bool,
}

impl DebugServer {
    /// Spawn the debugger and block until it reports that it is listening
    #[tracing::instrument(skip(command), fields(program = %command.program))]
    pub fn spawn(command: &ServerCommand, address: &str) -> Result<Self, ServerError> {
        let program = which::which(&command.program).map_err(|source| ServerError::NotFound {
            program: command.program.clone(),
            source,
        })?;

        let args = command.args_for(address);
        tracing::debug!(program = %program.display(), ?args, "starting server process");
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ServerError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(ServerError::Spawn {
                program: command.program.clone(),
                source: std::io::Error::other("child stdout was not captured"),
            });
        };

        tracing::debug!("waiting until server is ready");
        if let Err(e) = wait_for_ready(stdout, &command.ready_line, command.startup_timeout, &mut child) {
            reap(&mut child);
            return Err(e);
        }

        tracing::debug!(pid = child.id(), "server ready");
        Ok(Self {
            child,
            address: address.to_string(),
            killed: false,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Exit status if the process has already exited
    pub fn try_status(&mut self) -> Option<ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    /// Kill the process and wait for it
    ///
    /// A process that has already exited is not an error, and calling this
    /// more than once is harmless.
    pub fn kill(&mut self) -> Result<(), ServerError> {
        if self.killed {
            return Ok(());
        }
        self.killed = true;

        if let Some(status) = self.try_status() {
            tracing::debug!(%status, "server already exited");
            return Ok(());
        }

        tracing::debug!("terminating server");
        match self.child.kill() {
            Ok(()) => {}
            // raced with the process exiting on its own
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => {
                tracing::warn!(error = %e, "server exited before it could be killed");
            }
            Err(e) => return Err(ServerError::Kill(e)),
        }
        let status = self.child.wait().map_err(ServerError::Kill)?;
        tracing::debug!(%status, "server terminated");
        Ok(())
    }
}

impl Drop for DebugServer {
    fn drop(&mut self) {
        if let Err(e) = self.kill() {
            tracing::warn!(error = %e, "could not terminate server process");
        }
    }
}

fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "killing server after failed startup");
    }
    let _ = child.wait();
}

/// Wait for a server process to output a line containing `needle`
///
/// Stdout is read on a background thread that keeps draining (and logging)
/// the output after readiness so the child never blocks on a full pipe.
fn wait_for_ready(
    reader: impl Read + Send + 'static,
    needle: &str,
    timeout: Duration,
    child: &mut Child,
) -> Result<(), ServerError> {
    let needle_owned = needle.to_string();
    let (tx, rx) = mpsc::channel();

    let collected_output = Arc::new(Mutex::new(VecDeque::<String>::new()));
    let collected_output_writer = collected_output.clone();

    thread::spawn(move || {
        let reader = BufReader::new(reader);
        let mut ready = false;
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if ready {
                tracing::trace!(target: "server::stdout", "{line}");
                continue;
            }
            if let Ok(mut output) = collected_output_writer.lock() {
                if output.len() == COLLECTED_LINES {
                    output.pop_front();
                }
                output.push_back(line.clone());
            }
            if line.contains(&needle_owned) {
                ready = true;
                let _ = tx.send(());
            }
        }
    });

    let output = || {
        collected_output
            .lock()
            .map(|o| o.iter().cloned().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default()
    };

    match rx.recv_timeout(timeout) {
        Ok(()) => Ok(()),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ServerError::StartupTimeout {
            timeout,
            ready_line: needle.to_string(),
            output: output(),
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            let status = match child.try_wait() {
                Ok(Some(status)) => format!("process exited with status: {status}"),
                Ok(None) => "stdout closed while process still running".to_string(),
                Err(e) => format!("could not check process status: {e}"),
            };
            Err(ServerError::ExitedBeforeReady {
                status,
                output: output(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(program: &str, args: &[&str]) -> Child {
        Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn test process")
    }

    #[test]
    fn wait_for_ready_timeout() {
        let mut child = spawn("sleep", &["60"]);
        let stdout = child.stdout.take().unwrap();
        let result = wait_for_ready(stdout, "READY", Duration::from_millis(100), &mut child);

        let _ = child.kill();
        let _ = child.wait();

        let err = result.unwrap_err();
        assert!(matches!(err, ServerError::StartupTimeout { .. }), "got {err:?}");
        assert!(err.to_string().contains("timed out"), "got: {err}");
    }

    #[test]
    fn wait_for_ready_success() {
        let mut child = spawn("echo", &["Server is READY now"]);
        let stdout = child.stdout.take().unwrap();
        let result = wait_for_ready(stdout, "READY", Duration::from_secs(5), &mut child);
        let _ = child.wait();
        assert!(result.is_ok(), "expected success, got: {:?}", result.err());
    }

    #[test]
    fn wait_for_ready_process_exits_early() {
        let mut child = spawn("echo", &["something else"]);
        let stdout = child.stdout.take().unwrap();
        let result = wait_for_ready(stdout, "NEVER_FOUND", Duration::from_secs(5), &mut child);
        let _ = child.wait();

        let Err(ServerError::ExitedBeforeReady { output, .. }) = result else {
            panic!("expected readiness failure, got {result:?}");
        };
        assert_eq!(output, "something else");
    }

    #[test]
    fn address_is_substituted() {
        let command = ServerCommand::delve();
        assert_eq!(
            command.args_for("127.0.0.1:9090"),
            vec!["dap", "--listen", "127.0.0.1:9090", "--log", "--log-output", "dap"]
        );
    }
}
