use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of positional edit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Insert,
    Delete,
    Replace,
    /// Anything a peer sent that we don't understand. Applying it is a no-op.
    #[serde(other)]
    Unknown,
}

/// A single positional edit against a base text.
///
/// `position` and `delete_count` are UTF-16 code-unit offsets. They are signed
/// so that malformed values from peers still parse and get clamped by the
/// applier instead of dropping the whole frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditOperation {
    #[serde(default)]
    pub user_id: String,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub delete_count: i64,
    #[serde(default)]
    pub client_version: i64,
}

impl EditOperation {
    pub fn insert(position: i64, content: impl Into<String>) -> Self {
        Self::new(OperationType::Insert, position, content.into(), 0)
    }

    pub fn delete(position: i64, delete_count: i64) -> Self {
        Self::new(OperationType::Delete, position, String::new(), delete_count)
    }

    pub fn replace(position: i64, content: impl Into<String>, delete_count: i64) -> Self {
        Self::new(OperationType::Replace, position, content.into(), delete_count)
    }

    fn new(op_type: OperationType, position: i64, content: String, delete_count: i64) -> Self {
        Self {
            user_id: String::new(),
            op_type,
            position,
            content,
            delete_count,
            client_version: 0,
        }
    }

    /// Offset just past the inserted content, where the author's caret lands.
    pub fn caret_after(&self) -> i64 {
        let inserted = match self.op_type {
            OperationType::Insert | OperationType::Replace => self.content.encode_utf16().count(),
            OperationType::Delete | OperationType::Unknown => 0,
        };
        self.position.max(0).saturating_add(inserted as i64)
    }
}
