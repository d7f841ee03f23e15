//! Session status machine.

/// Lifecycle status of a console session.
///
/// A session starts in `Connecting` while the target probe runs. It becomes
/// `Ready` when the target is reachable, or `Degraded` when the probe fails
/// but the session stays usable for local diagnostics (`:history`, `:clear`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session created, target probe in progress.
    #[default]
    Connecting,
    /// Target reachable, accepting commands.
    Ready,
    /// Target probe failed; session usable for diagnostics only.
    Degraded,
    /// Session torn down and removed.
    Closed,
}

impl SessionStatus {
    /// Check if transition to target status is valid.
    ///
    /// Valid transitions:
    /// - Connecting -> Ready | Degraded | Closed
    /// - Ready -> Degraded | Closed
    /// - Degraded -> Ready | Closed
    pub fn can_transition_to(&self, target: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (*self, target),
            (Connecting, Ready)
                | (Connecting, Degraded)
                | (Connecting, Closed)
                | (Ready, Degraded)
                | (Ready, Closed)
                | (Degraded, Ready)
                | (Degraded, Closed)
        )
    }

    /// Attempt to transition to a new status.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: SessionStatus) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::ConsoleError::InvalidStatusTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Closed)
    }

    /// Check if the session can accept command input.
    ///
    /// Degraded sessions still accept commands; execution against an
    /// unreachable target fails visibly at the backend.
    pub fn can_execute(&self) -> bool {
        matches!(self, SessionStatus::Ready | SessionStatus::Degraded)
    }
}
