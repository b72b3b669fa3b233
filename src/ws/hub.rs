use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{
    CursorMessage, DocumentSnapshotResponse, EditMessage, InitMessage, SendMessage, UserJoinedMessage,
    UserLeftMessage,
};
use crate::services::doc_store::DocumentStore;
use crate::ws::connctx::ConnHandle;
use crate::ws::room::Room;
use crate::ws::snapshot_cache::{CachedSnapshot, SnapshotCache};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    JoinRequired,
    InvalidJoin,
    IdentityMismatch,
    NotJoined(String),
    DocumentNotFound(String),
    LoadFailed(String),
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubError::JoinRequired => write!(f, "Join a document first"),
            HubError::InvalidJoin => write!(f, "documentId and userId are required"),
            HubError::IdentityMismatch => write!(f, "userId does not match the authenticated user"),
            HubError::NotJoined(id) => write!(f, "Not joined to document '{}'", id),
            HubError::DocumentNotFound(id) => write!(f, "Document '{}' not found", id),
            HubError::LoadFailed(id) => write!(f, "Failed to load document '{}'", id),
        }
    }
}

impl std::error::Error for HubError {}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub rooms: u32,
    pub connections: u32,
    pub dirty_rooms: u32,
    pub cached_snapshots: u32,
}

/// Registry of open rooms, one per document.
///
/// The map lock is never held while waiting on a room, and a room is unlocked
/// before the map is written, so the two can't deadlock.
pub struct Hub {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
    store: Arc<dyn DocumentStore>,
    snapshots: SnapshotCache,
    persist_on_close: bool,
}

impl Hub {
    pub fn new(store: Arc<dyn DocumentStore>, snapshots: SnapshotCache, persist_on_close: bool) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            store,
            snapshots,
            persist_on_close,
        }
    }

    async fn room(&self, document_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(document_id).cloned()
    }

    async fn get_or_create_room(&self, document_id: &str) -> Arc<Mutex<Room>> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(document_id.to_string())
            .or_insert_with(|| {
                debug!("Opening room for document {}", document_id);
                Arc::new(Mutex::new(Room::pending(document_id)))
            })
            .clone()
    }

    /// Drop `room` from the registry if it is still the registered one.
    async fn unregister(&self, document_id: &str, room: &Arc<Mutex<Room>>) {
        let mut rooms = self.rooms.write().await;
        if rooms.get(document_id).is_some_and(|r| Arc::ptr_eq(r, room)) {
            rooms.remove(document_id);
        }
    }

    /// Add a participant to a document's room.
    ///
    /// The joiner gets `init` with the room's current snapshot, everyone else
    /// gets `user_joined`. Both are queued while the room is locked, so the
    /// snapshot includes every edit already relayed to existing participants.
    pub async fn join(&self, conn: &ConnHandle, document_id: &str, user_id: &str, username: &str) -> Result<(), HubError> {
        loop {
            let room = self.get_or_create_room(document_id).await;
            let mut r = room.lock().await;

            // Emptied between lookup and lock; open a fresh one
            if r.closed {
                drop(r);
                self.unregister(document_id, &room).await;
                continue;
            }

            if !r.loaded {
                match self.load_snapshot(document_id).await {
                    Ok(snapshot) => r.load(snapshot.content, snapshot.version, snapshot.dirty),
                    Err(e) => {
                        r.closed = true;
                        drop(r);
                        self.unregister(document_id, &room).await;
                        return Err(e);
                    }
                }
            }

            if let Some(displaced) = r.add_participant(user_id, username, conn.clone()) {
                if displaced.conn.conn_id != conn.conn_id {
                    info!("User {} rejoined document {} from a new connection", user_id, document_id);
                }
            }

            let active_users = r.active_users();
            conn.send(&SendMessage::Init(InitMessage {
                document_id: document_id.to_string(),
                content: r.content.clone(),
                version: r.version,
                active_users: active_users.clone(),
            }));
            r.broadcast(
                &SendMessage::UserJoined(UserJoinedMessage {
                    user_id: user_id.to_string(),
                    username: username.to_string(),
                    active_users: Some(active_users),
                }),
                user_id,
            );

            info!("User {} joined document {} ({} participants)", user_id, document_id, r.len());
            return Ok(());
        }
    }

    async fn load_snapshot(&self, document_id: &str) -> Result<CachedSnapshot, HubError> {
        if let Some(snapshot) = self.snapshots.take(document_id) {
            debug!("Reopening document {} from the snapshot cache", document_id);
            return Ok(snapshot);
        }

        match self.store.load(document_id).await {
            Ok(Some(doc)) => Ok(CachedSnapshot { content: doc.content, version: doc.version, dirty: false }),
            Ok(None) => {
                warn!("Document {} not found", document_id);
                Err(HubError::DocumentNotFound(document_id.to_string()))
            }
            Err(e) => {
                error!("Failed to load document {}: {}", document_id, e);
                Err(HubError::LoadFailed(document_id.to_string()))
            }
        }
    }

    /// Remove a participant and announce it. Closes the room when it empties.
    /// Returns false if the connection was not (or no longer) in the room.
    pub async fn leave(&self, conn_id: Uuid, document_id: &str, user_id: &str) -> bool {
        let Some(room) = self.room(document_id).await else {
            return false;
        };
        let mut r = room.lock().await;
        let Some(removed) = r.remove_participant(user_id, conn_id) else {
            return false;
        };

        r.broadcast(
            &SendMessage::UserLeft(UserLeftMessage {
                user_id: user_id.to_string(),
                username: removed.username,
            }),
            user_id,
        );
        info!("User {} left document {} ({} participants)", user_id, document_id, r.len());

        if !r.is_empty() {
            return true;
        }

        // Cached before unregistering so a concurrent reopen sees the latest text
        r.closed = true;
        let snapshot = CachedSnapshot { content: r.content.clone(), version: r.version, dirty: r.dirty };
        self.snapshots.put(document_id, snapshot.clone());
        drop(r);
        self.unregister(document_id, &room).await;

        info!("Closed room for document {} at version {}", document_id, snapshot.version);
        if snapshot.dirty && self.persist_on_close {
            if let Err(e) = self.store.save(document_id, &snapshot.content).await {
                error!("Failed to save document {}: {}", document_id, e);
            }
        }
        true
    }

    /// Apply an edit to the room's snapshot and relay `frame`, the message
    /// exactly as the sender wrote it.
    pub async fn edit(&self, conn_id: Uuid, user_id: &str, edit_msg: &EditMessage, frame: &str) -> Result<(), HubError> {
        let document_id = edit_msg.document_id.as_str();
        let room = self.room(document_id).await.ok_or_else(|| HubError::NotJoined(document_id.to_string()))?;
        let mut r = room.lock().await;
        if !r.is_member(user_id, conn_id) {
            return Err(HubError::NotJoined(document_id.to_string()));
        }

        if r.apply(&edit_msg.edit) {
            r.update_cursor(user_id, edit_msg.edit.caret_after());
        }
        let relayed = r.broadcast_text(frame, user_id);
        debug!("Edit on {} by {} now at version {}, relayed to {}", document_id, user_id, r.version, relayed);
        Ok(())
    }

    /// Record a cursor move and relay it unchanged.
    pub async fn cursor(&self, conn_id: Uuid, user_id: &str, cursor_msg: &CursorMessage) -> Result<(), HubError> {
        let document_id = cursor_msg.document_id.as_str();
        let room = self.room(document_id).await.ok_or_else(|| HubError::NotJoined(document_id.to_string()))?;
        let mut r = room.lock().await;
        if !r.is_member(user_id, conn_id) {
            return Err(HubError::NotJoined(document_id.to_string()));
        }

        r.update_cursor(user_id, cursor_msg.cursor_position);
        r.broadcast(&SendMessage::Cursor(cursor_msg.clone()), user_id);
        Ok(())
    }

    /// Current snapshot of an open room.
    pub async fn snapshot(&self, document_id: &str) -> Option<DocumentSnapshotResponse> {
        let room = self.room(document_id).await?;
        let r = room.lock().await;
        if r.closed || !r.loaded {
            return None;
        }
        Some(r.snapshot())
    }

    pub async fn stats(&self) -> HubStats {
        let rooms: Vec<Arc<Mutex<Room>>> = self.rooms.read().await.values().cloned().collect();
        let mut stats = HubStats {
            cached_snapshots: self.snapshots.entry_count() as u32,
            ..HubStats::default()
        };
        for room in rooms {
            let r = room.lock().await;
            if r.closed {
                continue;
            }
            stats.rooms += 1;
            stats.connections += r.len() as u32;
            if r.dirty {
                stats.dirty_rooms += 1;
            }
        }
        stats
    }
}
