use tracing::warn;

use crate::models::CursorMessage;
use crate::ws::connctx::ConnCtx;
use crate::ws::{Hub, HubError};

/// Handle CursorMessage
pub async fn handle_cursor_message(cursor_msg: CursorMessage, hub: &Hub, ctx: &ConnCtx) {
    let Some(joined) = ctx.joined.as_ref() else {
        ctx.send_error(HubError::JoinRequired);
        return;
    };
    if joined.document_id != cursor_msg.document_id {
        ctx.send_error(HubError::NotJoined(cursor_msg.document_id));
        return;
    }

    if let Err(e) = hub.cursor(ctx.conn_id(), &joined.user_id, &cursor_msg).await {
        warn!("Cursor update on document {} rejected: {}", cursor_msg.document_id, e);
        ctx.send_error(e);
    }
}
