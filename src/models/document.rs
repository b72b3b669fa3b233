use serde::{Deserialize, Serialize};

/// Document record as returned by the external document service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default = "default_can_write")]
    pub can_write: bool,
}

fn default_can_write() -> bool {
    true
}

/// Partial update accepted by the document service.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Identity returned by the "who am I" endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    #[serde(alias = "userId")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}
