use std::sync::Arc;

use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::chat::capability::{classify, CapabilityClass};
use crate::chat::history;
use crate::chat::materialize::{self, storage_path, NormalizedResponse};
use crate::chat::turns::{
    build_user_turn, Attachment, Role, Turn, MAX_ATTACHMENT_BYTES, MAX_ATTACHMENT_COUNT,
};
use crate::chat::ChatError;
use crate::genai::GenerativeModel;
use crate::store::models::{AuthUser, MessageType, NewMessage};
use crate::store::{BlobStore, RecordStore};

/// One parsed chat request. The client-sent history field never makes it
/// this far; the persisted history is the only context source.
#[derive(Debug, Default)]
pub struct ChatSubmission {
    pub session_id: Option<Uuid>,
    pub message: Option<String>,
    pub model: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Per-request pipeline: validate, persist the user's turn, invoke the
/// model per its capability class, materialize the output. Clients are
/// injected once at startup and shared across requests.
pub struct ChatService {
    model: Arc<dyn GenerativeModel>,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    default_model: String,
    max_history: usize,
}

impl ChatService {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        default_model: String,
        max_history: usize,
    ) -> Self {
        Self {
            model,
            records,
            blobs,
            default_model,
            max_history,
        }
    }

    pub async fn submit(
        &self,
        user: &AuthUser,
        submission: ChatSubmission,
    ) -> Result<NormalizedResponse, ChatError> {
        let message = submission.message.as_deref().filter(|m| !m.is_empty());

        if message.is_none() && submission.attachments.is_empty() {
            return Err(ChatError::Validation(
                "A message or at least one file is required".to_string(),
            ));
        }
        let session_id = submission
            .session_id
            .ok_or_else(|| ChatError::Validation("A sessionId is required".to_string()))?;
        if submission.attachments.len() > MAX_ATTACHMENT_COUNT {
            return Err(ChatError::Validation(format!(
                "At most {} files per message",
                MAX_ATTACHMENT_COUNT
            )));
        }
        if let Some(oversized) = submission
            .attachments
            .iter()
            .find(|a| a.size_bytes() > MAX_ATTACHMENT_BYTES)
        {
            return Err(ChatError::Validation(format!(
                "File {} exceeds the 5 MiB limit",
                oversized.original_name
            )));
        }

        let owner_id = self
            .records
            .fetch_user(&user.id)
            .await?
            .ok_or(ChatError::NotFound("User"))?;
        let session = self
            .records
            .fetch_session(session_id, owner_id)
            .await?
            .ok_or(ChatError::Authorization)?;

        // A request naming the default model defers to whatever the session
        // was created with.
        let requested = submission.model.as_deref().unwrap_or(&self.default_model);
        let model_id = if requested == self.default_model {
            session.model.clone()
        } else {
            requested.to_string()
        };

        self.persist_user_turn(session_id, message, &submission.attachments)
            .await?;

        match classify(&model_id) {
            CapabilityClass::ImageGeneration => {
                // Image generation is stateless per turn; no history is sent.
                let prompt = message.ok_or_else(|| {
                    ChatError::Validation(
                        "A text prompt is required to generate images".to_string(),
                    )
                })?;
                info!("Generating image with {}", model_id);
                let bytes = self.model.generate_image(&model_id, prompt).await?;
                materialize::materialize_generated_image(
                    bytes,
                    session_id,
                    self.records.as_ref(),
                    self.blobs.as_ref(),
                )
                .await
            }
            CapabilityClass::ImageCapableChat => {
                let contents = self
                    .assemble_contents(session_id, message, &submission.attachments)
                    .await?;
                let output = self.model.generate_content(&model_id, &contents).await?;
                materialize::materialize_chat_output(
                    &output,
                    session_id,
                    self.records.as_ref(),
                    self.blobs.as_ref(),
                )
                .await
            }
            CapabilityClass::TextChat => {
                let contents = self
                    .assemble_contents(session_id, message, &submission.attachments)
                    .await?;
                let output = self.model.generate_content(&model_id, &contents).await?;

                let text = output.joined_text();
                self.records
                    .append_message(&NewMessage {
                        session_id,
                        role: Role::Model,
                        content: Some(text.clone()),
                        message_type: MessageType::Text,
                        file_path: None,
                        file_name: None,
                        file_type: None,
                        metadata: match &output.usage {
                            Some(usage) => json!({ "usage": usage }),
                            None => json!({}),
                        },
                    })
                    .await?;

                Ok(NormalizedResponse {
                    response: Some(text),
                    usage: output.usage,
                    ..Default::default()
                })
            }
        }
    }

    /// One record per stored attachment (tagged with its position), or a
    /// single text record when nothing was uploaded. A failed upload skips
    /// that attachment's record but never the rest of the turn.
    async fn persist_user_turn(
        &self,
        session_id: Uuid,
        message: Option<&str>,
        attachments: &[Attachment],
    ) -> Result<(), ChatError> {
        let mut stored = 0usize;

        for attachment in attachments {
            let (path, _) = storage_path(session_id, "user", attachment.extension());

            if let Err(e) = self
                .blobs
                .put(&path, attachment.bytes.clone(), &attachment.mime_type)
                .await
            {
                error!("Failed to upload {}: {}", attachment.original_name, e);
                continue;
            }

            let message_type = if attachment.mime_type.starts_with("image/") {
                MessageType::Image
            } else {
                MessageType::File
            };

            self.records
                .append_message(&NewMessage {
                    session_id,
                    role: Role::User,
                    content: message.map(str::to_string),
                    message_type,
                    file_path: Some(path),
                    file_name: Some(attachment.original_name.clone()),
                    file_type: Some(attachment.mime_type.clone()),
                    metadata: json!({ "fileIndex": stored }),
                })
                .await?;
            stored += 1;
        }

        if stored == 0 {
            if let Some(text) = message {
                self.records
                    .append_message(&NewMessage {
                        session_id,
                        role: Role::User,
                        content: Some(text.to_string()),
                        message_type: MessageType::Text,
                        file_path: None,
                        file_name: None,
                        file_type: None,
                        metadata: json!({}),
                    })
                    .await?;
            }
        }

        Ok(())
    }

    /// Persisted history (already including this turn's records) plus the
    /// freshly built user turn.
    async fn assemble_contents(
        &self,
        session_id: Uuid,
        message: Option<&str>,
        attachments: &[Attachment],
    ) -> Result<Vec<Turn>, ChatError> {
        let records = self.records.fetch_history(session_id).await?;
        let start = records.len().saturating_sub(self.max_history);
        let mut contents = history::normalize(&records[start..], self.blobs.as_ref()).await;

        let turn = build_user_turn(message, attachments);
        if !turn.is_empty() {
            contents.push(turn);
        }

        Ok(contents)
    }
}
