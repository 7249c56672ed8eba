use serde::{Deserialize, Serialize};

pub const MAX_ATTACHMENT_COUNT: usize = 5;
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Document mime types the model accepts alongside image/*.
const SUPPORTED_DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "text/plain",
    "text/csv",
    "text/html",
    "text/markdown",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "audio/wav",
    "audio/mp3",
    "audio/aiff",
    "audio/aac",
    "audio/ogg",
    "audio/flac",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineBinary { mime_type: String, bytes: Vec<u8> },
}

/// One role-tagged ordered sequence of content parts sent to or received
/// from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl Turn {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            parts: Vec::new(),
        }
    }

    pub fn text(role: Role, content: &str) -> Self {
        Self {
            role,
            parts: vec![ContentPart::Text(content.to_string())],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// A user-submitted file accompanying one chat request, not yet persisted.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn extension(&self) -> &str {
        self.original_name.rsplit('.').next().unwrap_or("bin")
    }
}

pub fn is_document_supported(mime_type: &str) -> bool {
    SUPPORTED_DOCUMENT_TYPES.contains(&mime_type)
}

pub fn is_model_consumable(mime_type: &str) -> bool {
    mime_type.starts_with("image/") || is_document_supported(mime_type)
}

/// Builds the model-input turn for the current submission. The text part
/// comes first, then one inline part per attachment the model can consume.
/// Unsupported attachments are left out of the turn; the dispatcher still
/// persists them as `file` records so the history keeps the full audit trail.
pub fn build_user_turn(message: Option<&str>, attachments: &[Attachment]) -> Turn {
    let mut turn = Turn::new(Role::User);

    if let Some(text) = message.filter(|m| !m.is_empty()) {
        turn.parts.push(ContentPart::Text(text.to_string()));
    }

    for attachment in attachments {
        if is_model_consumable(&attachment.mime_type) {
            turn.parts.push(ContentPart::InlineBinary {
                mime_type: attachment.mime_type.clone(),
                bytes: attachment.bytes.clone(),
            });
        }
    }

    turn
}
