//! Bridge configuration
//!
//! Read from `$XDG_CONFIG_HOME/dap-bridge/config.toml` (or an explicit path).
//! Every key is optional:
//!
//! ```toml
//! host = "127.0.0.1"
//! response_timeout_secs = 0
//!
//! [debugger]
//! command = "dlv"
//! args = ["dap", "--listen", "{address}", "--log", "--log-output", "dap"]
//! ready_line = "DAP server listening at"
//! startup_timeout_secs = 30
//! ```
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use server::ServerCommand;

/// Environment variable overriding `debugger.command`
pub const DEBUGGER_ENV_VAR: &str = "DAP_BRIDGE_DEBUGGER";

const APP_DIR: &str = "dap-bridge";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Address the debugger listens on and the bridge connects to
    pub host: String,
    /// Give up on plain request/response waits after this long; 0 waits forever
    pub response_timeout_secs: u64,
    pub debugger: DebuggerConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            response_timeout_secs: 0,
            debugger: DebuggerConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn response_timeout(&self) -> Option<Duration> {
        (self.response_timeout_secs > 0).then(|| Duration::from_secs(self.response_timeout_secs))
    }

    /// `host:port`
    pub fn address(&self, port: u16) -> String {
        format!("{}:{port}", self.host)
    }

    fn with_debugger_override(mut self, command: Option<String>) -> Self {
        if let Some(command) = command.filter(|c| !c.trim().is_empty()) {
            tracing::debug!(%command, "debugger command overridden from environment");
            self.debugger.command = command;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebuggerConfig {
    pub command: String,
    /// `{address}` is replaced with `host:port`
    pub args: Vec<String>,
    pub ready_line: String,
    pub startup_timeout_secs: u64,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        let delve = ServerCommand::delve();
        Self {
            command: delve.program,
            args: delve.args,
            ready_line: delve.ready_line,
            startup_timeout_secs: delve.startup_timeout.as_secs(),
        }
    }
}

impl DebuggerConfig {
    pub fn server_command(&self) -> ServerCommand {
        ServerCommand {
            program: self.command.clone(),
            args: self.args.clone(),
            ready_line: self.ready_line.clone(),
            startup_timeout: Duration::from_secs(self.startup_timeout_secs),
        }
    }
}

/// Default location of the config file, if the platform has a config dir
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Load the configuration
///
/// An explicit `path` must exist. Without one the default location is tried
/// and a missing file there means defaults. [`DEBUGGER_ENV_VAR`] is applied
/// last.
pub fn load(path: Option<&Path>) -> Result<BridgeConfig, ConfigError> {
    let config = match path {
        Some(path) => from_file(path)?,
        None => match default_path() {
            Some(path) if path.exists() => from_file(&path)?,
            _ => {
                tracing::debug!("no config file found, using defaults");
                BridgeConfig::default()
            }
        },
    };
    Ok(config.with_debugger_override(std::env::var(DEBUGGER_ENV_VAR).ok()))
}

fn from_file(path: &Path) -> Result<BridgeConfig, ConfigError> {
    tracing::debug!(path = %path.display(), "loading config");
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_delve() {
        let config = BridgeConfig::default();
        assert_eq!(config.address(9090), "127.0.0.1:9090");
        assert_eq!(config.response_timeout(), None);
        assert_eq!(config.debugger.server_command(), ServerCommand::delve());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
response_timeout_secs = 5

[debugger]
startup_timeout_secs = 2
"#,
        );
        let config = from_file(file.path()).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.response_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.debugger.command, "dlv");
        assert_eq!(
            config.debugger.server_command().startup_timeout,
            Duration::from_secs(2)
        );
    }

    #[test]
    fn custom_debugger() {
        let file = write_config(
            r#"
host = "localhost"

[debugger]
command = "/opt/go/bin/dlv"
args = ["dap", "-l", "{address}"]
ready_line = "listening"
"#,
        );
        let config = from_file(file.path()).unwrap();
        let command = config.debugger.server_command();
        assert_eq!(command.program, "/opt/go/bin/dlv");
        assert_eq!(command.args, vec!["dap", "-l", "{address}"]);
        assert_eq!(config.address(2345), "localhost:2345");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }), "got {err:?}");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let file = write_config("host = [");
        assert!(matches!(
            from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));

        let file = write_config("hots = \"typo\"");
        assert!(matches!(
            from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn environment_overrides_command() {
        let config = BridgeConfig::default().with_debugger_override(Some("/usr/local/bin/dlv".into()));
        assert_eq!(config.debugger.command, "/usr/local/bin/dlv");

        let config = BridgeConfig::default().with_debugger_override(Some("  ".into()));
        assert_eq!(config.debugger.command, "dlv");
    }
}
