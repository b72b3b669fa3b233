use tracing::{error, info, warn};

use crate::models::JoinMessage;
use crate::ws::connctx::{ConnCtx, JoinedDoc};
use crate::ws::{Hub, HubError};

/// Handle JoinMessage
pub async fn handle_join_message(join_msg: JoinMessage, hub: &Hub, ctx: &mut ConnCtx) {
    info!("Join message received for document {}: user={}", join_msg.document_id, join_msg.user_id);

    if join_msg.document_id.is_empty() || join_msg.user_id.is_empty() {
        ctx.send_error(HubError::InvalidJoin);
        return;
    }

    // With auth on, a connection may only join as its token's subject
    if let Some(identity) = &ctx.identity {
        if identity.user_id != join_msg.user_id {
            warn!("Connection {} authenticated as {} tried to join as {}", ctx.conn_id(), identity.user_id, join_msg.user_id);
            ctx.send_error(HubError::IdentityMismatch);
            return;
        }
    }

    let username = join_msg
        .username
        .filter(|u| !u.is_empty())
        .or_else(|| ctx.identity.as_ref().and_then(|i| i.username.clone()))
        .unwrap_or_else(|| join_msg.user_id.clone());

    let target = JoinedDoc { document_id: join_msg.document_id, user_id: join_msg.user_id };

    // Moving to another document (or identity) leaves the previous room first
    if let Some(prev) = ctx.joined.take() {
        if prev != target {
            hub.leave(ctx.conn_id(), &prev.document_id, &prev.user_id).await;
        }
    }

    match hub.join(&ctx.handle, &target.document_id, &target.user_id, &username).await {
        Ok(()) => ctx.joined = Some(target),
        Err(e) => {
            error!("Join of {} to document {} failed: {}", target.user_id, target.document_id, e);
            ctx.send_error(e);
        }
    }
}
