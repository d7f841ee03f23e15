//! Local shell execution backend.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{ExecBackend, ExecOutcome};

/// Default login shell.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Runs commands through a login shell on the local machine.
#[derive(Debug, Clone)]
pub struct LocalShellBackend {
    shell: String,
}

impl LocalShellBackend {
    /// Create a backend using the given shell binary.
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for LocalShellBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

#[async_trait]
impl ExecBackend for LocalShellBackend {
    async fn run(&self, command: &str, timeout: Duration) -> ExecOutcome {
        debug!(shell = %self.shell, %command, "running local command");

        let child = Command::new(&self.shell)
            .arg("-lc")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout reaps the child.
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => return ExecOutcome::failure(format!("Local exec error: {}", e)),
        };

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => ExecOutcome::timed_out(timeout),
            Ok(Err(e)) => ExecOutcome::failure(format!("Local exec error: {}", e)),
            Ok(Ok(output)) => ExecOutcome {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(1),
            },
        }
    }

    fn describe(&self) -> String {
        format!("local shell ({})", self.shell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EXIT_TIMEOUT;

    #[tokio::test]
    #[cfg(unix)]
    async fn test_echo() {
        let backend = LocalShellBackend::default();
        let outcome = backend.run("echo hi", Duration::from_secs(5)).await;

        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stdout.contains("hi"));
        assert!(outcome.success());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_nonzero_exit_code_passthrough() {
        let backend = LocalShellBackend::default();
        let outcome = backend.run("exit 7", Duration::from_secs(5)).await;
        assert_eq!(outcome.exit_code, 7);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_stderr_captured() {
        let backend = LocalShellBackend::default();
        let outcome = backend
            .run("echo oops >&2; exit 1", Duration::from_secs(5))
            .await;

        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.stderr.contains("oops"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_timeout_yields_124() {
        let backend = LocalShellBackend::default();
        let outcome = backend.run("sleep 5", Duration::from_secs(1)).await;

        assert_eq!(outcome.exit_code, EXIT_TIMEOUT);
        assert!(outcome.stdout.is_empty());
        assert!(outcome.stderr.contains("Timeout (1s)"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_just_under_timeout_real_exit_code() {
        let backend = LocalShellBackend::default();
        let outcome = backend
            .run("sleep 0.1; exit 3", Duration::from_secs(5))
            .await;
        assert_eq!(outcome.exit_code, 3);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_encoded() {
        let backend = LocalShellBackend::new("/nonexistent/shell");
        let outcome = backend.run("echo hi", Duration::from_secs(5)).await;

        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.stderr.contains("Local exec error"));
    }
}
