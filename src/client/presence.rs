use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::models::ActiveUser;

/// Minimum spacing between two outgoing cursor messages.
pub const MIN_SEND_INTERVAL: Duration = Duration::from_millis(60);

/// A repeat of the last sent position inside this window is not sent again.
pub const REPEAT_SUPPRESS_WINDOW: Duration = Duration::from_millis(500);

/// What happened to a local cursor update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorDecision {
    /// Send this position now.
    Send(i64),
    /// Too soon after the last send; a deferred send fires at the instant.
    Deferred(Instant),
    /// A deferred send was already pending; it now carries this position.
    Coalesced,
    /// Same position as the last send, recently enough to skip.
    Suppressed,
}

#[derive(Debug, Clone, Copy)]
struct PendingCursor {
    position: i64,
    fire_at: Instant,
}

/// Client-side presence: the roster of participants in the document, their
/// cursors, and rate limiting of the local user's own cursor updates.
#[derive(Debug)]
pub struct PresenceTracker {
    local_user_id: String,
    participants: BTreeMap<String, ActiveUser>,
    last_sent: Option<(i64, Instant)>,
    pending: Option<PendingCursor>,
}

impl PresenceTracker {
    pub fn new(local_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            participants: BTreeMap::new(),
            last_sent: None,
            pending: None,
        }
    }

    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    /// Rate-limit a local cursor move.
    ///
    /// At most one deferred send is outstanding at a time; later moves only
    /// update the position it will carry.
    pub fn request_cursor(&mut self, position: i64, now: Instant) -> CursorDecision {
        if let Some(pending) = self.pending.as_mut() {
            pending.position = position;
            return CursorDecision::Coalesced;
        }

        if let Some((last_position, last_at)) = self.last_sent {
            let elapsed = now.saturating_duration_since(last_at);
            if last_position == position && elapsed < REPEAT_SUPPRESS_WINDOW {
                return CursorDecision::Suppressed;
            }
            if elapsed < MIN_SEND_INTERVAL {
                let fire_at = last_at + MIN_SEND_INTERVAL;
                self.pending = Some(PendingCursor { position, fire_at });
                return CursorDecision::Deferred(fire_at);
            }
        }

        self.last_sent = Some((position, now));
        CursorDecision::Send(position)
    }

    /// When the pending deferred send is due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.fire_at)
    }

    /// Run the deferred send. Returns the position to transmit, if any.
    pub fn fire(&mut self, now: Instant) -> Option<i64> {
        let pending = self.pending.take()?;
        match self.request_cursor(pending.position, now) {
            CursorDecision::Send(position) => Some(position),
            _ => None,
        }
    }

    /// Drop any pending deferred send.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn replace_roster(&mut self, active_users: Vec<ActiveUser>) {
        self.participants = active_users
            .into_iter()
            .map(|u| (u.user_id.clone(), u))
            .collect();
    }

    pub fn add_participant(&mut self, user_id: &str, username: &str) {
        self.participants.insert(
            user_id.to_string(),
            ActiveUser {
                user_id: user_id.to_string(),
                username: username.to_string(),
                cursor_position: 0,
            },
        );
    }

    pub fn remove_participant(&mut self, user_id: &str) -> Option<ActiveUser> {
        self.participants.remove(user_id)
    }

    pub fn clear_roster(&mut self) {
        self.participants.clear();
    }

    /// Record a remote cursor. Moves of the local user are ignored.
    pub fn update_cursor(&mut self, user_id: &str, username: Option<&str>, cursor_position: i64) -> bool {
        if user_id == self.local_user_id {
            return false;
        }
        let entry = self
            .participants
            .entry(user_id.to_string())
            .or_insert_with(|| ActiveUser {
                user_id: user_id.to_string(),
                username: user_id.to_string(),
                cursor_position: 0,
            });
        if let Some(username) = username.filter(|n| !n.is_empty()) {
            entry.username = username.to_string();
        }
        entry.cursor_position = cursor_position;
        true
    }

    pub fn participants(&self) -> impl Iterator<Item = &ActiveUser> {
        self.participants.values()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn cursor_of(&self, user_id: &str) -> Option<i64> {
        self.participants.get(user_id).map(|p| p.cursor_position)
    }

    /// Cursors of everyone except the local user.
    pub fn remote_cursors(&self) -> impl Iterator<Item = &ActiveUser> {
        self.participants
            .values()
            .filter(move |p| p.user_id != self.local_user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, cursor: i64) -> ActiveUser {
        ActiveUser { user_id: id.to_string(), username: id.to_uppercase(), cursor_position: cursor }
    }

    #[test]
    fn test_first_update_is_sent() {
        let mut tracker = PresenceTracker::new("me");
        assert_eq!(tracker.request_cursor(3, Instant::now()), CursorDecision::Send(3));
        assert_eq!(tracker.deadline(), None);
    }

    #[test]
    fn test_same_position_suppressed_within_window() {
        let mut tracker = PresenceTracker::new("me");
        let t0 = Instant::now();
        assert_eq!(tracker.request_cursor(7, t0), CursorDecision::Send(7));

        let mut sent = 0;
        for i in 1..50 {
            let now = t0 + Duration::from_millis(i * 10);
            if let CursorDecision::Send(_) = tracker.request_cursor(7, now) {
                sent += 1;
            }
            if let Some(p) = tracker.fire(now) {
                assert_eq!(p, 7);
                sent += 1;
            }
        }
        assert!(sent <= 1, "sent {sent} repeats inside the window");
    }

    #[test]
    fn test_same_position_resent_after_window() {
        let mut tracker = PresenceTracker::new("me");
        let t0 = Instant::now();
        tracker.request_cursor(7, t0);
        assert_eq!(
            tracker.request_cursor(7, t0 + REPEAT_SUPPRESS_WINDOW),
            CursorDecision::Send(7)
        );
    }

    #[test]
    fn test_burst_is_deferred_and_coalesced() {
        let mut tracker = PresenceTracker::new("me");
        let t0 = Instant::now();
        tracker.request_cursor(1, t0);

        let at = t0 + Duration::from_millis(10);
        assert_eq!(tracker.request_cursor(2, at), CursorDecision::Deferred(t0 + MIN_SEND_INTERVAL));
        assert_eq!(tracker.request_cursor(3, at), CursorDecision::Coalesced);
        assert_eq!(tracker.request_cursor(4, at), CursorDecision::Coalesced);
        assert_eq!(tracker.deadline(), Some(t0 + MIN_SEND_INTERVAL));

        // Latest position wins
        assert_eq!(tracker.fire(t0 + MIN_SEND_INTERVAL), Some(4));
        assert_eq!(tracker.deadline(), None);
    }

    #[test]
    fn test_fire_without_pending_is_noop() {
        let mut tracker = PresenceTracker::new("me");
        assert_eq!(tracker.fire(Instant::now()), None);
    }

    #[test]
    fn test_fire_back_to_last_position_is_suppressed() {
        let mut tracker = PresenceTracker::new("me");
        let t0 = Instant::now();
        tracker.request_cursor(1, t0);
        tracker.request_cursor(2, t0 + Duration::from_millis(5));
        tracker.request_cursor(1, t0 + Duration::from_millis(6));
        assert_eq!(tracker.fire(t0 + MIN_SEND_INTERVAL), None);
    }

    #[test]
    fn test_cancel_drops_pending() {
        let mut tracker = PresenceTracker::new("me");
        let t0 = Instant::now();
        tracker.request_cursor(1, t0);
        tracker.request_cursor(2, t0);
        assert!(tracker.deadline().is_some());
        tracker.cancel();
        assert_eq!(tracker.deadline(), None);
        assert_eq!(tracker.fire(t0 + MIN_SEND_INTERVAL), None);
    }

    #[test]
    fn test_rate_is_bounded_under_fast_input() {
        let mut tracker = PresenceTracker::new("me");
        let t0 = Instant::now();
        let mut sent = Vec::new();

        // One move per millisecond for a second
        for ms in 0..1000u64 {
            let now = t0 + Duration::from_millis(ms);
            if tracker.deadline().is_some_and(|d| d <= now) {
                sent.extend(tracker.fire(now));
            }
            if let CursorDecision::Send(p) = tracker.request_cursor(ms as i64, now) {
                sent.push(p);
            }
        }

        assert!(sent.len() <= 17, "sent {} cursor updates", sent.len());
        assert!(sent.len() >= 10);
    }

    #[test]
    fn test_roster_patch_and_replace() {
        let mut tracker = PresenceTracker::new("me");
        tracker.replace_roster(vec![user("me", 0), user("a", 4)]);
        assert_eq!(tracker.participant_count(), 2);

        tracker.add_participant("b", "Bee");
        assert_eq!(tracker.participant_count(), 3);
        assert_eq!(tracker.cursor_of("b"), Some(0));

        assert!(tracker.remove_participant("a").is_some());
        assert!(tracker.remove_participant("a").is_none());

        tracker.replace_roster(vec![user("c", 1)]);
        let ids: Vec<_> = tracker.participants().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn test_local_cursor_echo_ignored() {
        let mut tracker = PresenceTracker::new("me");
        tracker.replace_roster(vec![user("me", 0), user("a", 0)]);
        assert!(!tracker.update_cursor("me", None, 9));
        assert_eq!(tracker.cursor_of("me"), Some(0));

        assert!(tracker.update_cursor("a", Some("Ada"), 9));
        assert_eq!(tracker.cursor_of("a"), Some(9));
        let remote: Vec<_> = tracker.remote_cursors().map(|p| p.username.as_str()).collect();
        assert_eq!(remote, vec!["Ada"]);
    }

    #[test]
    fn test_cursor_from_unknown_user_adds_entry() {
        let mut tracker = PresenceTracker::new("me");
        assert!(tracker.update_cursor("z", None, 2));
        assert_eq!(tracker.cursor_of("z"), Some(2));
    }
}
