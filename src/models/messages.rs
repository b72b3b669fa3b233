use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::EditOperation;

/// Roster entry carried by `init` and `user_joined`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub cursor_position: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub document_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveMessage {
    pub document_id: String,
    pub user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditMessage {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub user_id: String,
    pub edit: EditOperation,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CursorMessage {
    #[serde(default)]
    pub document_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub cursor_position: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitMessage {
    #[serde(default)]
    pub document_id: String,
    pub content: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub active_users: Vec<ActiveUser>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserJoinedMessage {
    pub user_id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_users: Option<Vec<ActiveUser>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftMessage {
    pub user_id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub error: String,
}

/// Frames a client sends to the hub.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "leave")]
    Leave(LeaveMessage),
    #[serde(rename = "edit")]
    Edit(EditMessage),
    #[serde(rename = "cursor")]
    Cursor(CursorMessage),
}

/// Frames the hub sends to clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "init")]
    Init(InitMessage),
    #[serde(rename = "edit")]
    Edit(EditMessage),
    #[serde(rename = "cursor")]
    Cursor(CursorMessage),
    #[serde(rename = "user_joined")]
    UserJoined(UserJoinedMessage),
    #[serde(rename = "user_left")]
    UserLeft(UserLeftMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
}

impl SendMessage {
    pub fn error(message: impl Into<String>) -> Self {
        SendMessage::Error(ErrorMessage { error: message.into() })
    }
}
