//! Command-line interface for console-bridge.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::{ConsoleMode, ExecMode};

/// Command-line arguments.
///
/// All overrides are optional; unset fields defer to environment
/// variables, then the config file, then defaults.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<String>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Execution backend (local, ssh).
    pub exec_mode: Option<ExecMode>,
    /// Console strategy (structured, raw-attach).
    pub console_mode: Option<ConsoleMode>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                result.host = Some(parser.value()?.parse()?);
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('e') | Long("exec-mode") => {
                let value: String = parser.value()?.parse()?;
                result.exec_mode = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("exec-mode", value))?,
                );
            }
            Short('m') | Long("console-mode") => {
                let value: String = parser.value()?.parse()?;
                result.console_mode = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("console-mode", value))?,
                );
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"console-bridge {version}
Operator console bridge for remote shell targets

USAGE:
    console-bridge [OPTIONS]

OPTIONS:
    -H, --host <ADDR>           Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>           Port to listen on [default: 3000]
    -c, --config <FILE>         Path to configuration file (JSON)
    -e, --exec-mode <MODE>      Execution backend: local, ssh [default: local]
    -m, --console-mode <MODE>   Console strategy: structured, raw-attach
                                [default: structured]
    -l, --log-level <LVL>       Log level (error, warn, info, debug, trace)
    -h, --help                  Print help
    -V, --version               Print version

ENVIRONMENT VARIABLES:
    CONSOLE_BRIDGE_HOST         Host address (overrides config)
    CONSOLE_BRIDGE_PORT         Port number (overrides config)
    CONSOLE_BRIDGE_LOG_LEVEL    Log level (overrides config)
    EXEC_MODE                   Execution backend: local, ssh
    SSH_HOST                    Remote host for the ssh backend
    SSH_USER                    Remote user for the ssh backend
    SSH_KEY_PATH                Private key path for the ssh backend
    SSH_PORT                    Remote port for the ssh backend
    RUST_LOG                    Alternative log level setting

EXAMPLES:
    # Start with defaults (localhost:3000, local shell backend)
    console-bridge

    # Drive commands through a remote host
    EXEC_MODE=ssh SSH_HOST=10.0.0.5 SSH_USER=ops console-bridge

    # Raw PTY attachment on all interfaces
    console-bridge -H 0.0.0.0 -p 8080 -m raw-attach

    # Start with config file
    console-bridge -c /etc/console-bridge/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("console-bridge {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("console-bridge")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.host.is_none());
        assert!(result.port.is_none());
        assert!(result.exec_mode.is_none());
        assert!(!result.help);
    }

    #[test]
    fn test_host_port() {
        let result = parse_args_from(args(&["-H", "0.0.0.0", "-p", "8080"])).unwrap();
        assert_eq!(result.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(result.port, Some(8080));
    }

    #[test]
    fn test_long_options() {
        let result =
            parse_args_from(args(&["--host", "192.168.1.1", "--port", "9000"])).unwrap();
        assert_eq!(result.host.as_deref(), Some("192.168.1.1"));
        assert_eq!(result.port, Some(9000));
    }

    #[test]
    fn test_exec_mode() {
        let result = parse_args_from(args(&["-e", "ssh"])).unwrap();
        assert_eq!(result.exec_mode, Some(ExecMode::Ssh));
    }

    #[test]
    fn test_console_mode() {
        let result = parse_args_from(args(&["--console-mode", "raw-attach"])).unwrap();
        assert_eq!(result.console_mode, Some(ConsoleMode::RawAttach));
    }

    #[test]
    fn test_invalid_mode() {
        let result = parse_args_from(args(&["-e", "teleport"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_port() {
        let result = parse_args_from(args(&["-p", "not-a-port"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_help_version_flags() {
        let result = parse_args_from(args(&["--help"])).unwrap();
        assert!(result.help);
        let result = parse_args_from(args(&["-V"])).unwrap();
        assert!(result.version);
    }

    #[test]
    fn test_unexpected_positional() {
        let result = parse_args_from(args(&["stray"]));
        assert!(matches!(result, Err(ArgsError::UnexpectedArgument(_))));
    }

    #[test]
    fn test_config_path() {
        let result = parse_args_from(args(&["-c", "/etc/cb/config.json"])).unwrap();
        assert_eq!(
            result.config,
            Some(PathBuf::from("/etc/cb/config.json"))
        );
    }
}
