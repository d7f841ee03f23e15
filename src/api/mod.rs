//! API layer for console-bridge.
//!
//! The event channel lives on a WebSocket; a small REST surface exists for
//! health checks and operator visibility into live sessions.
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check
//! - `GET /api/v1/` - API information
//!
//! ### Sessions
//! - `GET /api/v1/sessions` - List live console sessions
//!
//! ### Console
//! - `WS /api/v1/console/ws` - Console event channel
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use console_bridge::api::{serve_with_state, AppState, ServerConfig};
//! use console_bridge::backend::LocalShellBackend;
//! use console_bridge::console::ConsoleController;
//! use console_bridge::session::SessionRegistry;
//! use console_bridge::target::DockerTargetLifecycle;
//!
//! #[tokio::main]
//! async fn main() -> console_bridge::Result<()> {
//!     let registry = Arc::new(SessionRegistry::new());
//!     let backend = Arc::new(LocalShellBackend::default());
//!     let lifecycle = Arc::new(DockerTargetLifecycle::new(
//!         backend.clone(),
//!         Duration::from_secs(10),
//!     ));
//!     let driver = Arc::new(ConsoleController::new(
//!         Arc::clone(&registry),
//!         backend,
//!         lifecycle,
//!         200,
//!         Duration::from_secs(30),
//!     ));
//!     let state = AppState::new(registry, driver);
//!     serve_with_state(ServerConfig::default(), state).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use handlers::AppState;
pub use router::{create_router_with_state, serve_with_state, ServerConfig};
pub use types::{ErrorResponse, ListSessionsResponse, SessionSummary};
