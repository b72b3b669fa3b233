use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::ReceivedMessage;
use crate::services::auth_service::{self, Identity};
use crate::utils::scope_guard::ScopeGuard;
use crate::websocket::msg_cursor_handler::handle_cursor_message;
use crate::websocket::msg_edit_handler::handle_edit_message;
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_leave_handler::handle_leave_message;
use crate::ws::connctx::{ConnCtx, ConnHandle, OUTBOUND_QUEUE_CAPACITY};
use crate::ws::Hub;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    info!("New WebSocket connection attempt");

    // Browsers can't set headers on an upgrade, so the token may also come in the query
    let identity = match app_state.config.auth_jwt_secret.as_deref().filter(|s| !s.is_empty()) {
        Some(secret) => {
            let token = match auth_service::get_auth_token(&headers).ok().or(query.token) {
                Some(token) => token,
                None => {
                    warn!("WebSocket upgrade without a token");
                    return StatusCode::UNAUTHORIZED.into_response();
                }
            };
            match auth_service::identity_from_token(&token, secret) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!("WebSocket upgrade rejected: {}", e);
                    return StatusCode::UNAUTHORIZED.into_response();
                }
            }
        }
        None => None,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, app_state, identity))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: AppState, identity: Option<Identity>) {
    // Every frame for this client goes through one queue, so per-sender order is kept
    let (handle, mut rx) = ConnHandle::channel(OUTBOUND_QUEUE_CAPACITY);
    let overflow = handle.overflow_signal();
    let mut ctx = ConnCtx::new(handle, identity);
    info!("WebSocket connection established with connection_id: {}", ctx.conn_id());

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Forward queued frames to the client until it overflows or goes away
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(text) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = overflow.notified() => break,
            }
        }
    });
    let writer = send_task.abort_handle();
    let _abort_writer = ScopeGuard::new(move || writer.abort());

    // Inbound frames are handled one at a time on this task
    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_frame(&text, &app_state.hub, &mut ctx).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("WebSocket error on connection {}: {}", ctx.conn_id(), e);
                    break;
                }
                // Binary frames and pings are not part of the protocol
                Some(Ok(_)) => continue,
            },
            _ = &mut send_task => break,
        }
    }

    // Abrupt close counts as a leave
    if let Some(joined) = ctx.joined.take() {
        app_state.hub.leave(ctx.conn_id(), &joined.document_id, &joined.user_id).await;
    }
    info!("WebSocket connection {} terminated", ctx.conn_id());
}

/// Parse one text frame and dispatch it. Unparseable frames are dropped.
async fn handle_frame(text: &str, hub: &Hub, ctx: &mut ConnCtx) {
    let msg: ReceivedMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!("Dropping unparseable frame on connection {}: {}", ctx.conn_id(), e);
            return;
        }
    };

    match msg {
        ReceivedMessage::Join(join_msg) => handle_join_message(join_msg, hub, ctx).await,
        ReceivedMessage::Leave(leave_msg) => handle_leave_message(leave_msg, hub, ctx).await,
        ReceivedMessage::Edit(edit_msg) => handle_edit_message(edit_msg, text, hub, ctx).await,
        ReceivedMessage::Cursor(cursor_msg) => handle_cursor_message(cursor_msg, hub, ctx).await,
    }
}
