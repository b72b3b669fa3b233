//! Positional text operations shared by the hub and the session client.

pub mod apply;
pub mod diff;

pub use apply::apply_edit;
pub use diff::compute_edit;
