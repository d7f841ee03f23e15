//! Error types for console-bridge.

use thiserror::Error;

/// Main error type for console-bridge operations.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Session with the given ID was not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Target probe failed; the shell target cannot be reached.
    #[error("target unreachable: {0}")]
    TargetUnreachable(String),

    /// Backend transport or credential setup failed.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Command exceeded its execution timeout.
    #[error("command timed out after {0}s")]
    CommandTimeout(u64),

    /// Command completed with a non-zero exit code.
    #[error("command failed with exit code {0}")]
    CommandFailed(i32),

    /// Underlying stream or event channel broke.
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid session status transition attempted.
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidStatusTransition {
        from: crate::session::SessionStatus,
        to: crate::session::SessionStatus,
    },

    /// PTY-related error (raw attach mode).
    #[error("PTY error: {0}")]
    Pty(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience Result type for console-bridge operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_found_display() {
        let err = ConsoleError::SessionNotFound("con-00000001".into());
        assert!(err.to_string().contains("con-00000001"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_target_unreachable_display() {
        let err = ConsoleError::TargetUnreachable("web1".into());
        assert!(err.to_string().contains("web1"));
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn test_command_timeout_display() {
        let err = ConsoleError::CommandTimeout(30);
        assert!(err.to_string().contains("30"));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ConsoleError = io_err.into();
        assert!(matches!(err, ConsoleError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_command_failed_display() {
        let err = ConsoleError::CommandFailed(7);
        assert!(err.to_string().contains('7'));
    }
}
