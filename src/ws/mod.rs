pub mod connctx;
pub mod hub;
pub mod room;
pub mod snapshot_cache;

pub use hub::{Hub, HubError, HubStats};
