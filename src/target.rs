//! Target reachability probing and lifecycle control.
//!
//! A target is either the reserved name `local` (the backend's own shell)
//! or a Docker container name on the host the backend reaches. Probing and
//! starting are plain shell commands routed through the configured
//! [`ExecBackend`], so they work identically for local and SSH deployments.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::backend::ExecBackend;
use crate::error::ConsoleError;
use crate::Result;

/// Reserved target name for the backend host itself.
pub const LOCAL_TARGET: &str = "local";

/// A target name is a single shell-safe token.
pub fn valid_target(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
}

/// Result of a reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// The target exists and answered the probe.
    pub reachable: bool,
    /// The target is currently running.
    pub running: bool,
    /// Human-readable diagnostic, empty when healthy.
    pub detail: String,
}

impl ProbeReport {
    pub fn healthy() -> Self {
        Self {
            reachable: true,
            running: true,
            detail: String::new(),
        }
    }

    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self {
            reachable: false,
            running: false,
            detail: detail.into(),
        }
    }
}

/// Probe and start operations on a named target.
#[async_trait]
pub trait TargetLifecycle: Send + Sync {
    /// Check whether the target exists and is running.
    async fn probe(&self, target: &str) -> ProbeReport;

    /// Attempt to start a stopped target.
    async fn start(&self, target: &str) -> Result<()>;
}

/// Lifecycle driver for Docker containers, with `local` passthrough.
pub struct DockerTargetLifecycle {
    backend: Arc<dyn ExecBackend>,
    probe_timeout: Duration,
}

impl DockerTargetLifecycle {
    pub fn new(backend: Arc<dyn ExecBackend>, probe_timeout: Duration) -> Self {
        Self {
            backend,
            probe_timeout,
        }
    }
}

#[async_trait]
impl TargetLifecycle for DockerTargetLifecycle {
    async fn probe(&self, target: &str) -> ProbeReport {
        if !valid_target(target) {
            return ProbeReport::unreachable(format!("invalid target name: {:?}", target));
        }

        if target == LOCAL_TARGET {
            // The backend host itself; a trivial command proves the shell
            // path works end to end.
            let outcome = self.backend.run("true", self.probe_timeout).await;
            return if outcome.success() {
                ProbeReport::healthy()
            } else {
                ProbeReport::unreachable(outcome.stderr.trim().to_string())
            };
        }

        let command = format!(
            "docker inspect --format '{{{{.State.Running}}}}' {}",
            target
        );
        let outcome = self.backend.run(&command, self.probe_timeout).await;
        debug!(%target, exit_code = outcome.exit_code, "probe finished");

        if outcome.success() {
            ProbeReport {
                reachable: true,
                running: outcome.stdout.trim() == "true",
                detail: String::new(),
            }
        } else {
            ProbeReport::unreachable(outcome.stderr.trim().to_string())
        }
    }

    async fn start(&self, target: &str) -> Result<()> {
        if !valid_target(target) {
            return Err(ConsoleError::TargetUnreachable(format!(
                "invalid target name: {:?}",
                target
            )));
        }
        if target == LOCAL_TARGET {
            // Nothing to start.
            return Ok(());
        }

        let command = format!("docker start {}", target);
        let outcome = self.backend.run(&command, self.probe_timeout).await;

        if outcome.success() {
            Ok(())
        } else {
            warn!(%target, stderr = %outcome.stderr.trim(), "target start failed");
            Err(ConsoleError::TargetUnreachable(format!(
                "failed to start {}: {}",
                target,
                outcome.stderr.trim()
            )))
        }
    }
}
