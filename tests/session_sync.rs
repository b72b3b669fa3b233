mod common;

use std::time::Duration;

use colabri_sync::client::{ConnectionState, LocalEdit, Notice, Session, SessionConfig, SessionEvent};
use common::{make_token, TestServer};

fn session(server: &TestServer, doc: &str, user: &str, name: &str) -> Session {
    Session::new(SessionConfig {
        hub_url: server.ws_url(),
        document_id: doc.to_string(),
        user_id: user.to_string(),
        username: name.to_string(),
        token: None,
    })
}

/// Pump events until one matches, failing after a second.
async fn wait_for<F>(session: &mut Session, mut pred: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    loop {
        let event = tokio::time::timeout_at(deadline, session.next_event())
            .await
            .expect("timed out waiting for event")
            .expect("session closed");
        if pred(&event) {
            return event;
        }
    }
}

/// Drain whatever arrives within a short window.
async fn settle(session: &mut Session) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(150), session.next_event()).await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_two_sessions_converge() {
    let server = TestServer::open().await;
    let mut alice = session(&server, "shared", "a", "Alice");
    let mut bob = session(&server, "shared", "b", "Bob");

    alice.connect().await.unwrap();
    wait_for(&mut alice, |e| matches!(e, SessionEvent::Synced { .. })).await;
    bob.connect().await.unwrap();
    wait_for(&mut bob, |e| matches!(e, SessionEvent::Synced { .. })).await;
    wait_for(&mut alice, |e| matches!(e, SessionEvent::Notice(Notice::Joined { .. }))).await;

    assert!(matches!(alice.apply_from_user("hello").unwrap(), LocalEdit::Sent(_)));
    wait_for(&mut bob, |e| matches!(e, SessionEvent::RemoteEdit(_))).await;
    assert_eq!(bob.text(), "hello");

    assert!(matches!(bob.apply_from_user("hello world").unwrap(), LocalEdit::Sent(_)));
    wait_for(&mut alice, |e| matches!(e, SessionEvent::RemoteEdit(_))).await;
    assert_eq!(alice.text(), "hello world");

    // Applying the remote edit produced nothing for bob to receive back
    let echoes: Vec<_> = settle(&mut bob)
        .await
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::RemoteEdit(_)))
        .collect();
    assert!(echoes.is_empty());

    let snapshot = server.state.hub.snapshot("shared").await.unwrap();
    assert_eq!(snapshot.content, "hello world");
}

#[tokio::test]
async fn test_cursor_reaches_peer() {
    let server = TestServer::open().await;
    let mut alice = session(&server, "cursors", "a", "Alice");
    let mut bob = session(&server, "cursors", "b", "Bob");
    alice.connect().await.unwrap();
    wait_for(&mut alice, |e| matches!(e, SessionEvent::Synced { .. })).await;
    bob.connect().await.unwrap();
    wait_for(&mut bob, |e| matches!(e, SessionEvent::Synced { .. })).await;

    alice.set_cursor(3);
    let event = wait_for(&mut bob, |e| matches!(e, SessionEvent::CursorMoved { .. })).await;
    assert_eq!(
        event,
        SessionEvent::CursorMoved { user_id: "a".to_string(), cursor_position: 3 }
    );
    assert_eq!(bob.presence().cursor_of("a"), Some(3));
}

#[tokio::test]
async fn test_drop_announces_leave() {
    let server = TestServer::open().await;
    let mut alice = session(&server, "leaving", "a", "Alice");
    let mut bob = session(&server, "leaving", "b", "Bob");
    alice.connect().await.unwrap();
    wait_for(&mut alice, |e| matches!(e, SessionEvent::Synced { .. })).await;
    bob.connect().await.unwrap();
    wait_for(&mut bob, |e| matches!(e, SessionEvent::Synced { .. })).await;

    drop(bob);
    let event = wait_for(&mut alice, |e| matches!(e, SessionEvent::Notice(Notice::Left { .. }))).await;
    assert_eq!(
        event,
        SessionEvent::Notice(Notice::Left { user_id: "b".to_string(), username: "Bob".to_string() })
    );
    assert_eq!(alice.presence().participant_count(), 1);
}

#[tokio::test]
async fn test_reconnect_after_leave_resyncs() {
    let server = TestServer::open().await;
    let mut alice = session(&server, "again", "a", "Alice");
    alice.connect().await.unwrap();
    wait_for(&mut alice, |e| matches!(e, SessionEvent::Synced { .. })).await;
    alice.apply_from_user("draft").unwrap();

    alice.leave();
    assert_eq!(alice.state(), ConnectionState::Disconnected);
    assert!(matches!(alice.apply_from_user("draft 2").unwrap(), LocalEdit::Dropped(_)));

    alice.connect().await.unwrap();
    let event = wait_for(&mut alice, |e| matches!(e, SessionEvent::Synced { .. })).await;
    // The offline edit was never sent, so the hub's copy wins
    assert_eq!(event, SessionEvent::Synced { content: "draft".to_string() });
    assert_eq!(alice.text(), "draft");
}

#[tokio::test]
async fn test_session_sends_bearer_token() {
    let server = TestServer::with_auth().await;
    let mut anonymous = session(&server, "secure", "u1", "Uma");
    assert!(anonymous.connect().await.is_err());
    assert_eq!(anonymous.state(), ConnectionState::Disconnected);

    let mut config = SessionConfig {
        hub_url: server.ws_url(),
        document_id: "secure".to_string(),
        user_id: "u1".to_string(),
        username: "Uma".to_string(),
        token: Some(make_token("u1", "Uma")),
    };
    let mut uma = Session::new(config.clone());
    uma.connect().await.unwrap();
    wait_for(&mut uma, |e| matches!(e, SessionEvent::Synced { .. })).await;

    // Joining as someone else is refused by the hub
    config.user_id = "u2".to_string();
    let mut imposter = Session::new(config);
    imposter.connect().await.unwrap();
    let event = wait_for(&mut imposter, |e| matches!(e, SessionEvent::Notice(_))).await;
    assert!(matches!(event, SessionEvent::Notice(Notice::HubError(_))));
}
