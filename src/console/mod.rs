//! Console session strategies.
//!
//! A [`SessionDriver`] owns the lifetime of one client's console: what
//! happens on connect, what input means, and what to tear down on
//! disconnect. Two strategies exist: the structured controller (discrete
//! commands, history, special commands) and the raw PTY attach bridge.
//! The deployment picks one in configuration.

use async_trait::async_trait;

use crate::events::EventSink;
use crate::session::SessionId;
use crate::Result;

mod attach;
mod controller;

pub use attach::RawAttachConsole;
pub use controller::ConsoleController;

/// Strategy interface between the transport layer and a console mode.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// A client opened a console against `target`.
    async fn connect(&self, id: SessionId, target: &str, sink: &EventSink) -> Result<()>;

    /// A client sent input. Interpretation is strategy-specific.
    async fn input(&self, id: SessionId, data: &str, sink: &EventSink) -> Result<()>;

    /// The client went away; release everything owned for this session.
    async fn disconnect(&self, id: SessionId) -> Result<()>;
}
