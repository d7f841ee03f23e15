//! Configuration management for console-bridge.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values
//!
//! Execution mode (local vs SSH) and console mode (structured vs raw attach)
//! are read once at process start; sessions do not override them.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Command execution backend configuration.
    pub exec: ExecSection,
    /// Console behavior configuration.
    pub console: ConsoleSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Which backend executes commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// Login shell on the local machine.
    #[default]
    Local,
    /// Non-interactive execution on a remote host over SSH.
    Ssh,
}

impl std::str::FromStr for ExecMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(ExecMode::Local),
            "ssh" => Ok(ExecMode::Ssh),
            other => Err(format!("unknown exec mode: {}", other)),
        }
    }
}

/// Execution backend configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecSection {
    /// Backend selector.
    pub mode: ExecMode,
    /// Login shell for the local backend.
    pub shell: String,
    /// Remote host settings for the ssh backend.
    pub ssh: SshSection,
}

impl Default for ExecSection {
    fn default() -> Self {
        Self {
            mode: ExecMode::Local,
            shell: "/bin/bash".to_string(),
            ssh: SshSection::default(),
        }
    }
}

/// SSH transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSection {
    pub host: String,
    pub user: String,
    pub key_path: String,
    pub port: u16,
}

impl Default for SshSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            user: "botops".to_string(),
            key_path: "/home/botops/.ssh/id_rsa".to_string(),
            port: 22,
        }
    }
}

/// Which session strategy drives connected clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsoleMode {
    /// Discrete command/response pairs with history.
    #[default]
    Structured,
    /// Raw byte-stream attachment to an interactive pseudo-terminal.
    RawAttach,
}

impl std::str::FromStr for ConsoleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "structured" => Ok(ConsoleMode::Structured),
            "raw-attach" | "raw" => Ok(ConsoleMode::RawAttach),
            other => Err(format!("unknown console mode: {}", other)),
        }
    }
}

/// Console behavior section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSection {
    /// Session strategy selector.
    pub mode: ConsoleMode,
    /// Maximum command records retained per session.
    pub history_capacity: usize,
    /// Per-command execution timeout in seconds.
    pub command_timeout_secs: u64,
    /// Target reachability probe timeout in seconds.
    pub probe_timeout_secs: u64,
    /// Shell spawned inside the target in raw attach mode.
    pub attach_shell: String,
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            mode: ConsoleMode::Structured,
            history_capacity: 200,
            command_timeout_secs: 30,
            probe_timeout_secs: 10,
            attach_shell: "/bin/bash".to_string(),
        }
    }
}

impl ConsoleSection {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    ///
    /// `EXEC_MODE` / `SSH_*` names match the original deployment environment.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("CONSOLE_BRIDGE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CONSOLE_BRIDGE_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(mode) = std::env::var("EXEC_MODE") {
            if let Ok(mode) = mode.parse() {
                self.exec.mode = mode;
            }
        }
        if let Ok(host) = std::env::var("SSH_HOST") {
            self.exec.ssh.host = host;
        }
        if let Ok(user) = std::env::var("SSH_USER") {
            self.exec.ssh.user = user;
        }
        if let Ok(key_path) = std::env::var("SSH_KEY_PATH") {
            self.exec.ssh.key_path = key_path;
        }
        if let Ok(port) = std::env::var("SSH_PORT") {
            if let Ok(port) = port.parse() {
                self.exec.ssh.port = port;
            }
        }
        if let Ok(level) = std::env::var("CONSOLE_BRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(mode) = args.exec_mode {
            self.exec.mode = mode;
        }
        if let Some(mode) = args.console_mode {
            self.console.mode = mode;
        }
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }

    /// Bind address for the API server.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
