use std::collections::VecDeque;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::client::presence::{CursorDecision, PresenceTracker};
use crate::models::{
    CursorMessage, DocumentRecord, EditMessage, EditOperation, JoinMessage, LeaveMessage,
    ReceivedMessage, SendMessage,
};
use crate::ops::{apply_edit, compute_edit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL of the hub, e.g. `ws://localhost:8082/ws/docs`
    pub hub_url: String,
    pub document_id: String,
    pub user_id: String,
    pub username: String,
    /// Bearer token sent with the upgrade request
    pub token: Option<String>,
}

/// Things the owning view may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StatusChanged(ConnectionState),
    /// The buffer was replaced by the hub's snapshot.
    Synced { content: String },
    RemoteEdit(EditOperation),
    CursorMoved { user_id: String, cursor_position: i64 },
    RosterChanged,
    Notice(Notice),
}

/// Transient notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Joined { user_id: String, username: String },
    Left { user_id: String, username: String },
    HubError(String),
}

/// Outcome of a local text change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEdit {
    Unchanged,
    Sent(EditOperation),
    /// Applied locally but not transmitted; there is no outbound queue.
    Dropped(EditOperation),
}

#[derive(Debug)]
pub enum SessionError {
    MissingIdentity,
    ReadOnly,
    InvalidToken,
    Connect(tungstenite::Error),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::MissingIdentity => write!(f, "A document id and user id are required to connect"),
            SessionError::ReadOnly => write!(f, "Document is read-only"),
            SessionError::InvalidToken => write!(f, "Token cannot be sent as a header"),
            SessionError::Connect(e) => write!(f, "Failed to connect to hub: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug)]
pub(crate) enum Outgoing {
    Text(String),
    Close,
}

#[derive(Debug)]
pub(crate) enum Inbound {
    Frame(String),
    Closed,
}

/// One live connection: a queue to the socket writer and a queue of frames
/// read from it.
pub(crate) struct Link {
    outbound: mpsc::UnboundedSender<Outgoing>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    reader: Option<AbortHandle>,
}

impl Link {
    pub(crate) fn spawn<S>(stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outgoing>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Inbound>();

        // Writer outlives the session so a final leave still gets flushed
        tokio::spawn(async move {
            while let Some(out) = out_rx.recv().await {
                match out {
                    Outgoing::Text(text) => {
                        if sink.send(Message::text(text)).await.is_err() {
                            break;
                        }
                    }
                    Outgoing::Close => {
                        let _ = sink.close().await;
                        break;
                    }
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if in_tx.send(Inbound::Frame(text.to_string())).is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Hub connection error: {}", e);
                        break;
                    }
                }
            }
            let _ = in_tx.send(Inbound::Closed);
        });

        Self { outbound: out_tx, inbound: in_rx, reader: Some(reader.abort_handle()) }
    }

    #[cfg(test)]
    pub(crate) fn from_channels(
        outbound: mpsc::UnboundedSender<Outgoing>,
        inbound: mpsc::UnboundedReceiver<Inbound>,
    ) -> Self {
        Self { outbound, inbound, reader: None }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

enum Step {
    Frame(String),
    Closed,
    CursorDue,
}

/// Client side of one open document.
///
/// Owns the local text buffer and at most one hub connection. Local changes
/// go through [`Session::apply_from_user`], hub changes through
/// [`Session::apply_from_remote`]; only the former is ever diffed and sent,
/// so applying a remote change can't echo back.
pub struct Session {
    config: SessionConfig,
    state: ConnectionState,
    text: String,
    version: i64,
    can_write: bool,
    presence: PresenceTracker,
    link: Option<Link>,
    events: VecDeque<SessionEvent>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let presence = PresenceTracker::new(config.user_id.clone());
        Self {
            config,
            state: ConnectionState::Disconnected,
            text: String::new(),
            version: 0,
            can_write: true,
            presence,
            link: None,
            events: VecDeque::new(),
        }
    }

    /// Seed the buffer from a fetched record before connecting.
    pub fn seed(&mut self, record: &DocumentRecord) {
        self.text = record.content.clone();
        self.version = record.version;
        self.can_write = record.can_write;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn can_write(&self) -> bool {
        self.can_write
    }

    pub fn document_id(&self) -> &str {
        &self.config.document_id
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Open the hub connection and join the document.
    ///
    /// Does nothing while already connecting or connected.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.state != ConnectionState::Disconnected {
            return Ok(());
        }
        if self.config.document_id.is_empty() || self.config.user_id.is_empty() {
            return Err(SessionError::MissingIdentity);
        }

        self.set_state(ConnectionState::Connecting);
        let request = match self.connect_request() {
            Ok(request) => request,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        match tokio_tungstenite::connect_async(request).await {
            Ok((stream, _)) => {
                info!("Connected to hub for document {}", self.config.document_id);
                self.attach(Link::spawn(stream));
                Ok(())
            }
            Err(e) => {
                warn!("Failed to connect to hub: {}", e);
                self.set_state(ConnectionState::Disconnected);
                Err(SessionError::Connect(e))
            }
        }
    }

    fn connect_request(&self) -> Result<tungstenite::handshake::client::Request, SessionError> {
        let mut request = self
            .config
            .hub_url
            .as_str()
            .into_client_request()
            .map_err(SessionError::Connect)?;
        if let Some(token) = self.config.token.as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| SessionError::InvalidToken)?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(request)
    }

    pub(crate) fn attach(&mut self, link: Link) {
        self.link = Some(link);
        let join = ReceivedMessage::Join(JoinMessage {
            document_id: self.config.document_id.clone(),
            user_id: self.config.user_id.clone(),
            username: Some(self.config.username.clone()),
        });
        self.send(&join);
        self.set_state(ConnectionState::Connected);
    }

    /// Wait for the next thing to happen on the connection.
    ///
    /// Also drives the deferred cursor send. Returns `None` once disconnected
    /// and every queued event has been taken.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Some(event);
            }

            let deadline = self.presence.deadline();
            let link = self.link.as_mut()?;
            let step = tokio::select! {
                frame = link.inbound.recv() => match frame {
                    Some(Inbound::Frame(text)) => Step::Frame(text),
                    Some(Inbound::Closed) | None => Step::Closed,
                },
                _ = sleep_until(deadline) => Step::CursorDue,
            };

            match step {
                Step::Frame(text) => self.handle_frame(&text),
                Step::Closed => {
                    info!("Hub connection for document {} closed", self.config.document_id);
                    self.link = None;
                    self.presence.cancel();
                    self.set_state(ConnectionState::Disconnected);
                }
                Step::CursorDue => {
                    if let Some(position) = self.presence.fire(Instant::now()) {
                        self.send_cursor(position);
                    }
                }
            }
        }
    }

    /// Handle one frame from the hub. Unparseable frames are dropped.
    pub fn handle_frame(&mut self, text: &str) {
        let msg: SendMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Dropping unparseable frame from hub: {}", e);
                return;
            }
        };

        match msg {
            SendMessage::Init(init) => {
                self.text = init.content;
                self.version = init.version;
                self.presence.replace_roster(init.active_users);
                self.events.push_back(SessionEvent::Synced { content: self.text.clone() });
                self.events.push_back(SessionEvent::RosterChanged);
            }
            SendMessage::Edit(edit_msg) => {
                self.apply_from_remote(&edit_msg.edit);
                self.events.push_back(SessionEvent::RemoteEdit(edit_msg.edit));
            }
            SendMessage::Cursor(cursor) => {
                if self.presence.update_cursor(&cursor.user_id, cursor.username.as_deref(), cursor.cursor_position) {
                    self.events.push_back(SessionEvent::CursorMoved {
                        user_id: cursor.user_id,
                        cursor_position: cursor.cursor_position,
                    });
                }
            }
            SendMessage::UserJoined(joined) => {
                match joined.active_users {
                    Some(active_users) => self.presence.replace_roster(active_users),
                    None => self.presence.add_participant(&joined.user_id, &joined.username),
                }
                self.events.push_back(SessionEvent::RosterChanged);
                self.events.push_back(SessionEvent::Notice(Notice::Joined {
                    user_id: joined.user_id,
                    username: joined.username,
                }));
            }
            SendMessage::UserLeft(left) => {
                self.presence.remove_participant(&left.user_id);
                self.events.push_back(SessionEvent::RosterChanged);
                self.events.push_back(SessionEvent::Notice(Notice::Left {
                    user_id: left.user_id,
                    username: left.username,
                }));
            }
            SendMessage::Error(err) => {
                warn!("Hub reported an error: {}", err.error);
                self.events.push_back(SessionEvent::Notice(Notice::HubError(err.error)));
            }
        }
    }

    /// The user changed the buffer to `text`.
    ///
    /// The change is diffed against the current buffer and sent as one edit
    /// while connected. Otherwise it stays local only.
    pub fn apply_from_user(&mut self, text: &str) -> Result<LocalEdit, SessionError> {
        if !self.can_write {
            return Err(SessionError::ReadOnly);
        }
        let Some(op) = compute_edit(&self.text, text, &self.config.user_id, self.version) else {
            return Ok(LocalEdit::Unchanged);
        };
        self.text = text.to_string();
        self.version += 1;

        if self.state != ConnectionState::Connected {
            return Ok(LocalEdit::Dropped(op));
        }
        let msg = ReceivedMessage::Edit(EditMessage {
            document_id: self.config.document_id.clone(),
            user_id: self.config.user_id.clone(),
            edit: op.clone(),
        });
        if self.send(&msg) {
            Ok(LocalEdit::Sent(op))
        } else {
            Ok(LocalEdit::Dropped(op))
        }
    }

    /// Apply an operation received from another participant.
    pub fn apply_from_remote(&mut self, op: &EditOperation) -> &str {
        self.text = apply_edit(&self.text, op);
        self.version += 1;
        &self.text
    }

    /// Move the local cursor, subject to rate limiting.
    pub fn set_cursor(&mut self, position: i64) -> Option<CursorDecision> {
        if self.state != ConnectionState::Connected {
            return None;
        }
        let decision = self.presence.request_cursor(position, Instant::now());
        if let CursorDecision::Send(position) = decision {
            self.send_cursor(position);
        }
        Some(decision)
    }

    /// Leave the document and close the connection.
    ///
    /// The `leave` frame is best effort.
    pub fn leave(&mut self) {
        if self.state == ConnectionState::Connected {
            let leave = ReceivedMessage::Leave(LeaveMessage {
                document_id: self.config.document_id.clone(),
                user_id: self.config.user_id.clone(),
            });
            self.send(&leave);
        }
        if let Some(link) = self.link.take() {
            let _ = link.outbound.send(Outgoing::Close);
        }
        self.presence.cancel();
        self.presence.clear_roster();
        self.set_state(ConnectionState::Disconnected);
    }

    fn send_cursor(&self, position: i64) {
        let msg = ReceivedMessage::Cursor(CursorMessage {
            document_id: self.config.document_id.clone(),
            user_id: self.config.user_id.clone(),
            username: Some(self.config.username.clone()),
            cursor_position: position,
        });
        self.send(&msg);
    }

    fn send(&self, msg: &ReceivedMessage) -> bool {
        let Some(link) = self.link.as_ref() else {
            return false;
        };
        match serde_json::to_string(msg) {
            Ok(text) => link.outbound.send(Outgoing::Text(text)).is_ok(),
            Err(e) => {
                warn!("Failed to encode message: {}", e);
                false
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            self.state = state;
            self.events.push_back(SessionEvent::StatusChanged(state));
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.leave();
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
