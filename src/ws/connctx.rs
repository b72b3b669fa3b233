use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::SendMessage;
use crate::services::auth_service::Identity;

/// Frames a connection may have queued before it counts as stalled.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// Outbound half of one WebSocket connection.
///
/// Sends are queued to the connection's writer task and never block, so they
/// are safe to issue while a room is locked. A peer that stops reading fills
/// its queue; the next send then raises the overflow signal and the writer
/// drops the connection.
#[derive(Clone, Debug)]
pub struct ConnHandle {
    pub conn_id: Uuid,
    tx: mpsc::Sender<String>,
    overflow: Arc<Notify>,
}

impl ConnHandle {
    /// A handle plus the receiving end its writer task drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = Self { conn_id: Uuid::new_v4(), tx, overflow: Arc::new(Notify::new()) };
        (handle, rx)
    }

    /// Serialize and queue a message. Returns false when the connection is gone.
    pub fn send(&self, msg: &SendMessage) -> bool {
        match serde_json::to_string(msg) {
            Ok(text) => self.send_text(text),
            Err(e) => {
                error!("Failed to serialize message for connection {}: {}", self.conn_id, e);
                false
            }
        }
    }

    pub fn send_text(&self, text: String) -> bool {
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue of connection {} is full, dropping it", self.conn_id);
                self.overflow.notify_one();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Notified once a send found the queue full.
    pub fn overflow_signal(&self) -> Arc<Notify> {
        self.overflow.clone()
    }
}

/// The document a connection has joined, and as whom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinedDoc {
    pub document_id: String,
    pub user_id: String,
}

/// Per-connection state owned by the socket task.
#[derive(Debug)]
pub struct ConnCtx {
    pub handle: ConnHandle,
    pub identity: Option<Identity>,
    pub joined: Option<JoinedDoc>,
}

impl ConnCtx {
    pub fn new(handle: ConnHandle, identity: Option<Identity>) -> Self {
        Self { handle, identity, joined: None }
    }

    pub fn conn_id(&self) -> Uuid {
        self.handle.conn_id
    }

    pub fn send_error(&self, error: impl std::fmt::Display) {
        self.handle.send(&SendMessage::error(error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_full_queue_signals_overflow() {
        let (handle, mut rx) = ConnHandle::channel(2);
        assert!(handle.send_text("a".to_string()));
        assert!(handle.send_text("b".to_string()));
        assert!(!handle.send_text("c".to_string()));

        let overflow = handle.overflow_signal();
        tokio::time::timeout(Duration::from_secs(1), overflow.notified())
            .await
            .expect("overflow signalled");
        assert_eq!(rx.recv().await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (handle, rx) = ConnHandle::channel(2);
        drop(rx);
        assert!(!handle.send(&SendMessage::error("gone")));
    }
}
