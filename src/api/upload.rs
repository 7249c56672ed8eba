use actix_multipart::{Field, Multipart, MultipartError};
use futures_util::{StreamExt, TryStreamExt};
use uuid::Uuid;

use crate::chat::dispatch::ChatSubmission;
use crate::chat::turns::{
    is_model_consumable, Attachment, MAX_ATTACHMENT_BYTES, MAX_ATTACHMENT_COUNT,
};
use crate::chat::ChatError;

/// Reads the multipart chat form into a `ChatSubmission`, enforcing the
/// upload limits before anything touches storage: at most 5 files, 5 MiB
/// each, mime type image/* or a supported document.
pub async fn parse_chat_form(mut payload: Multipart) -> Result<ChatSubmission, ChatError> {
    let mut submission = ChatSubmission::default();
    let mut file_count = 0usize;

    while let Some(field) = payload.try_next().await.map_err(bad_payload)? {
        let name = field.name().to_string();
        match name.as_str() {
            "message" => submission.message = Some(read_text(field).await?),
            "model" => submission.model = Some(read_text(field).await?),
            "sessionId" => {
                let raw = read_text(field).await?;
                submission.session_id = Uuid::parse_str(raw.trim()).ok();
            }
            // The client may send its own view of the history; the store is
            // authoritative, so it is drained and ignored.
            "history" => drain(field).await?,
            "files" => {
                file_count += 1;
                if file_count > MAX_ATTACHMENT_COUNT {
                    return Err(ChatError::Validation(format!(
                        "At most {} files per message",
                        MAX_ATTACHMENT_COUNT
                    )));
                }

                let original_name = field
                    .content_disposition()
                    .get_filename()
                    .unwrap_or("upload")
                    .to_string();
                let mime_type = field
                    .content_type()
                    .map(|mime| mime.essence_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                if !is_model_consumable(&mime_type) {
                    return Err(ChatError::Validation(format!(
                        "File type {} is not allowed",
                        mime_type
                    )));
                }

                let bytes = read_bytes(field).await?;
                submission.attachments.push(Attachment {
                    original_name,
                    mime_type,
                    bytes,
                });
            }
            _ => drain(field).await?,
        }
    }

    Ok(submission)
}

async fn read_bytes(mut field: Field) -> Result<Vec<u8>, ChatError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(bad_payload)?;
        if bytes.len() + chunk.len() > MAX_ATTACHMENT_BYTES {
            return Err(ChatError::Validation(
                "Files are limited to 5 MiB each".to_string(),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_text(field: Field) -> Result<String, ChatError> {
    let bytes = read_bytes(field).await?;
    String::from_utf8(bytes)
        .map_err(|_| ChatError::Validation("Form fields must be valid UTF-8".to_string()))
}

async fn drain(mut field: Field) -> Result<(), ChatError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(bad_payload)?;
    }
    Ok(())
}

fn bad_payload(err: MultipartError) -> ChatError {
    ChatError::Validation(format!("Malformed multipart payload: {}", err))
}
