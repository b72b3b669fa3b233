use tracing::{debug, warn};

use crate::models::EditMessage;
use crate::ws::connctx::ConnCtx;
use crate::ws::{Hub, HubError};

/// Handle EditMessage - apply to the room snapshot and relay `frame` as received
pub async fn handle_edit_message(edit_msg: EditMessage, frame: &str, hub: &Hub, ctx: &ConnCtx) {
    let Some(joined) = ctx.joined.as_ref() else {
        ctx.send_error(HubError::JoinRequired);
        return;
    };
    if joined.document_id != edit_msg.document_id {
        ctx.send_error(HubError::NotJoined(edit_msg.document_id));
        return;
    }

    debug!(
        "Edit message received for document {}: user={}, type={:?}, position={}",
        edit_msg.document_id, joined.user_id, edit_msg.edit.op_type, edit_msg.edit.position
    );

    if let Err(e) = hub.edit(ctx.conn_id(), &joined.user_id, &edit_msg, frame).await {
        warn!("Edit on document {} rejected: {}", edit_msg.document_id, e);
        ctx.send_error(e);
    }
}
