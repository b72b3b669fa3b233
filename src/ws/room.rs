use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{ActiveUser, DocumentSnapshotResponse, EditOperation, SendMessage};
use crate::ops::apply_edit;
use crate::ws::connctx::ConnHandle;

#[derive(Clone, Debug)]
pub struct Participant {
    pub conn: ConnHandle,
    pub username: String,
    pub cursor_position: i64,
}

/// Authoritative state of one document while anyone has it open.
///
/// A room is only ever touched behind its mutex, so edits and joins see it as
/// a single-threaded queue.
#[derive(Debug)]
pub struct Room {
    pub document_id: String,
    pub content: String,
    pub version: i64,
    /// Edited since it was loaded
    pub dirty: bool,
    /// Snapshot has been loaded from the store or the cache
    pub loaded: bool,
    /// Emptied and removed from the hub; joiners must open a fresh room
    pub closed: bool,
    participants: BTreeMap<String, Participant>,
}

impl Room {
    /// A room whose snapshot is not loaded yet.
    pub fn pending(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            content: String::new(),
            version: 0,
            dirty: false,
            loaded: false,
            closed: false,
            participants: BTreeMap::new(),
        }
    }

    pub fn load(&mut self, content: String, version: i64, dirty: bool) {
        self.content = content;
        self.version = version;
        self.dirty = dirty;
        self.loaded = true;
    }

    /// Register a participant, replacing any entry for the same user.
    /// Returns the displaced entry.
    pub fn add_participant(&mut self, user_id: &str, username: &str, conn: ConnHandle) -> Option<Participant> {
        self.participants.insert(
            user_id.to_string(),
            Participant { conn, username: username.to_string(), cursor_position: 0 },
        )
    }

    /// Remove `user_id` if it is still bound to `conn_id`. A connection that
    /// was displaced by a newer join can't remove its successor.
    pub fn remove_participant(&mut self, user_id: &str, conn_id: Uuid) -> Option<Participant> {
        if !self.is_member(user_id, conn_id) {
            return None;
        }
        self.participants.remove(user_id)
    }

    pub fn is_member(&self, user_id: &str, conn_id: Uuid) -> bool {
        self.participants
            .get(user_id)
            .is_some_and(|p| p.conn.conn_id == conn_id)
    }

    /// Apply an edit. Version and dirty flag only move when the text changed.
    pub fn apply(&mut self, op: &EditOperation) -> bool {
        let content = apply_edit(&self.content, op);
        if content == self.content {
            return false;
        }
        self.content = content;
        self.version += 1;
        self.dirty = true;
        true
    }

    pub fn update_cursor(&mut self, user_id: &str, cursor_position: i64) -> bool {
        match self.participants.get_mut(user_id) {
            Some(p) => {
                p.cursor_position = cursor_position;
                true
            }
            None => false,
        }
    }

    pub fn active_users(&self) -> Vec<ActiveUser> {
        self.participants
            .iter()
            .map(|(user_id, p)| ActiveUser {
                user_id: user_id.clone(),
                username: p.username.clone(),
                cursor_position: p.cursor_position,
            })
            .collect()
    }

    /// Send to every participant except `exclude_user_id`. Returns how many
    /// connections accepted the frame.
    pub fn broadcast(&self, msg: &SendMessage, exclude_user_id: &str) -> usize {
        match serde_json::to_string(msg) {
            Ok(text) => self.broadcast_text(&text, exclude_user_id),
            Err(e) => {
                tracing::error!("Failed to serialize broadcast for {}: {}", self.document_id, e);
                0
            }
        }
    }

    /// Send an already encoded frame to everyone except `exclude_user_id`.
    pub fn broadcast_text(&self, text: &str, exclude_user_id: &str) -> usize {
        self.participants
            .iter()
            .filter(|(user_id, _)| user_id.as_str() != exclude_user_id)
            .filter(|(_, p)| p.conn.send_text(text.to_string()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn snapshot(&self) -> DocumentSnapshotResponse {
        DocumentSnapshotResponse {
            document_id: self.document_id.clone(),
            content: self.content.clone(),
            version: self.version,
            dirty: self.dirty,
            active_users: self.active_users(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn conn() -> (ConnHandle, mpsc::Receiver<String>) {
        ConnHandle::channel(16)
    }

    fn loaded_room(content: &str) -> Room {
        let mut room = Room::pending("doc");
        room.load(content.to_string(), 0, false);
        room
    }

    #[test]
    fn test_rejoin_replaces_entry() {
        let mut room = loaded_room("");
        let (first, _rx1) = conn();
        let (second, _rx2) = conn();
        assert!(room.add_participant("u1", "alice", first.clone()).is_none());
        let displaced = room.add_participant("u1", "alice", second.clone()).unwrap();
        assert_eq!(displaced.conn.conn_id, first.conn_id);
        assert_eq!(room.len(), 1);

        // The displaced connection can't remove the live entry
        assert!(room.remove_participant("u1", first.conn_id).is_none());
        assert_eq!(room.len(), 1);
        assert!(room.remove_participant("u1", second.conn_id).is_some());
        assert!(room.is_empty());
    }

    #[test]
    fn test_apply_bumps_version_and_marks_dirty() {
        let mut room = loaded_room("hello");
        room.apply(&EditOperation::insert(5, "!"));
        assert_eq!(room.content, "hello!");
        assert_eq!(room.version, 1);
        assert!(room.dirty);
    }

    #[test]
    fn test_noop_edit_leaves_version_alone() {
        let mut room = loaded_room("hello");
        let mut unknown = EditOperation::insert(0, "x");
        unknown.op_type = crate::models::OperationType::Unknown;
        assert!(!room.apply(&unknown));
        assert!(!room.apply(&EditOperation::delete(99, 3)));
        assert_eq!(room.content, "hello");
        assert_eq!(room.version, 0);
        assert!(!room.dirty);
    }

    #[test]
    fn test_broadcast_skips_sender() {
        let mut room = loaded_room("");
        let (a, mut rx_a) = conn();
        let (b, mut rx_b) = conn();
        room.add_participant("a", "alice", a);
        room.add_participant("b", "bob", b);

        let sent = room.broadcast(&SendMessage::error("x"), "a");
        assert_eq!(sent, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().unwrap().contains("\"error\""));
    }

    #[test]
    fn test_cursor_updates_show_in_roster() {
        let mut room = loaded_room("abc");
        let (a, _rx) = conn();
        room.add_participant("a", "alice", a);
        assert!(room.update_cursor("a", 2));
        assert!(!room.update_cursor("ghost", 1));
        assert_eq!(room.active_users()[0].cursor_position, 2);
    }
}
