//! Command execution backends.
//!
//! A backend is the capability that actually runs a shell command somewhere:
//! on the local machine or on a remote host over SSH. The contract never
//! raises to the caller; all failure is encoded into the returned
//! [`ExecOutcome`] triple.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ExecMode, ExecSection};

mod local;
mod ssh;

pub use local::LocalShellBackend;
pub use ssh::SshBackend;

/// Exit code reserved for command timeout.
pub const EXIT_TIMEOUT: i32 = 124;

/// Default per-command execution timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of one command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecOutcome {
    /// Captured standard output, possibly empty.
    pub stdout: String,
    /// Captured standard error, possibly empty.
    pub stderr: String,
    /// Process exit code; 124 for timeout, 1 for spawn/transport failure.
    pub exit_code: i32,
}

impl ExecOutcome {
    /// Outcome for a command that exceeded its timeout.
    pub fn timed_out(timeout: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("Timeout ({}s)\n", timeout.as_secs()),
            exit_code: EXIT_TIMEOUT,
        }
    }

    /// Outcome for a spawn or transport failure.
    pub fn failure(detail: impl std::fmt::Display) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("{}\n", detail),
            exit_code: 1,
        }
    }

    /// Whether the command exited successfully.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A polymorphic "run a command string" capability.
///
/// Backends are stateless beyond their configuration and safe for
/// concurrent use by multiple sessions.
#[async_trait]
pub trait ExecBackend: Send + Sync {
    /// Run a command, capturing output in full within the timeout.
    ///
    /// Never returns an error: timeout yields exit code 124 with a
    /// `Timeout (<n>s)` stderr line, any setup failure yields exit code 1
    /// with the error text in stderr.
    async fn run(&self, command: &str, timeout: Duration) -> ExecOutcome;

    /// Short human-readable description for logs and status lines.
    fn describe(&self) -> String;
}

/// Build the deployment-wide backend from configuration.
///
/// Backend selection is one global choice per deployment; sessions do not
/// override it.
pub fn backend_from_config(exec: &ExecSection) -> Arc<dyn ExecBackend> {
    match exec.mode {
        ExecMode::Local => Arc::new(LocalShellBackend::new(exec.shell.clone())),
        ExecMode::Ssh => Arc::new(SshBackend::new(
            exec.ssh.host.clone(),
            exec.ssh.user.clone(),
            exec.ssh.key_path.clone(),
            exec.ssh.port,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_out_outcome() {
        let outcome = ExecOutcome::timed_out(Duration::from_secs(30));
        assert_eq!(outcome.exit_code, EXIT_TIMEOUT);
        assert_eq!(outcome.stderr, "Timeout (30s)\n");
        assert!(outcome.stdout.is_empty());
        assert!(!outcome.success());
    }

    #[test]
    fn test_failure_outcome() {
        let outcome = ExecOutcome::failure("no such shell");
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.stderr.contains("no such shell"));
    }

    #[test]
    fn test_backend_from_config_local() {
        let exec = ExecSection::default();
        let backend = backend_from_config(&exec);
        assert!(backend.describe().contains("local"));
    }

    #[test]
    fn test_backend_from_config_ssh() {
        let exec = ExecSection {
            mode: ExecMode::Ssh,
            ..Default::default()
        };
        let backend = backend_from_config(&exec);
        assert!(backend.describe().contains("ssh"));
    }
}
