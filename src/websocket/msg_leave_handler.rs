use tracing::info;

use crate::models::LeaveMessage;
use crate::ws::connctx::ConnCtx;
use crate::ws::{Hub, HubError};

/// Handle LeaveMessage
pub async fn handle_leave_message(leave_msg: LeaveMessage, hub: &Hub, ctx: &mut ConnCtx) {
    info!("Leave message received for document {}: user={}", leave_msg.document_id, leave_msg.user_id);

    let Some(joined) = ctx.joined.as_ref() else {
        ctx.send_error(HubError::JoinRequired);
        return;
    };
    if joined.document_id != leave_msg.document_id {
        ctx.send_error(HubError::NotJoined(leave_msg.document_id));
        return;
    }

    if let Some(joined) = ctx.joined.take() {
        hub.leave(ctx.conn_id(), &joined.document_id, &joined.user_id).await;
    }
}
