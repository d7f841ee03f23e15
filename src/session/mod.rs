//! Console session identity, status, and ownership.

mod id;
mod registry;
mod state;

pub use id::SessionId;
pub use registry::{Session, SessionRegistry};
pub use state::SessionStatus;
