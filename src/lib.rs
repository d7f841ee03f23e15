//! # console-bridge
//!
//! Operator console bridge for remote shell targets.
//!
//! This crate drives interactive consoles against containers, remote SSH
//! hosts, or the local machine. Each connected client gets a session with
//! a bounded command history; commands run on a pluggable execution
//! backend and results flow back over a typed event channel.
//!
//! ## Features
//!
//! - **Pluggable execution**: local login shell or remote SSH, one global
//!   choice per deployment
//! - **Structured console**: discrete command/response exchanges with
//!   history and special commands
//! - **Raw attach**: byte-for-byte PTY relay for full-screen programs
//! - **Session registry**: concurrent session ownership with bounded
//!   per-session history
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use console_bridge::backend::LocalShellBackend;
//! use console_bridge::console::{ConsoleController, SessionDriver};
//! use console_bridge::events::EventSink;
//! use console_bridge::session::{SessionId, SessionRegistry};
//! use console_bridge::target::DockerTargetLifecycle;
//!
//! #[tokio::main]
//! async fn main() -> console_bridge::Result<()> {
//!     console_bridge::logging::try_init().ok();
//!
//!     let registry = Arc::new(SessionRegistry::new());
//!     let backend = Arc::new(LocalShellBackend::default());
//!     let lifecycle = Arc::new(DockerTargetLifecycle::new(
//!         backend.clone(),
//!         Duration::from_secs(10),
//!     ));
//!     let console = ConsoleController::new(
//!         Arc::clone(&registry),
//!         backend,
//!         lifecycle,
//!         200,
//!         Duration::from_secs(30),
//!     );
//!
//!     let (sink, mut events) = EventSink::channel(256);
//!     let id = SessionId::new();
//!     console.connect(id, "local", &sink).await?;
//!     console.input(id, "uptime", &sink).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod backend;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod history;
pub mod logging;
pub mod session;
pub mod target;

// Re-export commonly used types
pub use backend::{ExecBackend, ExecOutcome, LocalShellBackend, SshBackend};
pub use config::{Config, ConsoleMode, ExecMode};
pub use console::{ConsoleController, RawAttachConsole, SessionDriver};
pub use error::{ConsoleError, Result};
pub use events::{ClientEvent, EventSink, ServerEvent};
pub use history::{CommandHistory, CommandRecord};
pub use session::{Session, SessionId, SessionRegistry, SessionStatus};
pub use target::{ProbeReport, TargetLifecycle};
