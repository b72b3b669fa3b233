pub mod health;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod messages;
pub mod operation;
pub mod snapshot;

pub use health::*;
pub use diagnostics::*;
pub use document::*;
pub use error::*;
pub use messages::*;
pub use operation::*;
pub use snapshot::*;
