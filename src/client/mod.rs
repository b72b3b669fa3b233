//! Editor-side half of the sync protocol.

pub mod presence;
pub mod session;

pub use presence::{CursorDecision, PresenceTracker};
pub use session::{ConnectionState, LocalEdit, Notice, Session, SessionConfig, SessionError, SessionEvent};
