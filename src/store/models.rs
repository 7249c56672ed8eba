use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::turns::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
}

/// One persisted, append-only history row. `message_type != text` implies
/// `file_path` and `file_type` are set and `content` may be null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub role: Role,
    pub content: Option<String>,
    pub message_type: MessageType,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A message about to be appended; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: Uuid,
    pub role: Role,
    pub content: Option<String>,
    pub message_type: MessageType,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub model: String,
}

/// The identity the auth service resolved from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}
