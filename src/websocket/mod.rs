pub mod handler;
pub mod msg_cursor_handler;
pub mod msg_edit_handler;
pub mod msg_join_handler;
pub mod msg_leave_handler;

pub use handler::websocket_handler;
