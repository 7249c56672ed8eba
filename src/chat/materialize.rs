use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::chat::turns::Role;
use crate::chat::ChatError;
use crate::genai::models::{ModelOutput, OutputPart, TokenUsage};
use crate::store::models::{MessageType, NewMessage};
use crate::store::{BlobStore, RecordStore};

pub const SIGNED_URL_TTL_SECONDS: u32 = 3600;

/// The wire shape every chat pipeline answers with. `text`/`images` are the
/// multimodal fields; `response` is the legacy single-text fallback clients
/// use when they are absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(rename = "isStoredImage", skip_serializing_if = "Option::is_none")]
    pub is_stored_image: Option<bool>,
}

/// Storage key for a generated or uploaded artifact, keyed by session with a
/// timestamp + random token suffix so concurrent writes cannot collide.
/// Returns (path, file name).
pub fn storage_path(session_id: Uuid, prefix: &str, extension: &str) -> (String, String) {
    let timestamp = Utc::now().timestamp_millis();
    let file_name = format!("{}_{}_{}.{}", prefix, timestamp, path_token(), extension);
    (format!("chat/{}/{}", session_id, file_name), file_name)
}

fn path_token() -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}

/// Signed URL with a public-URL fallback; deriving a URL never fails the
/// response.
async fn retrieval_url(blobs: &dyn BlobStore, path: &str) -> String {
    match blobs.signed_url(path, SIGNED_URL_TTL_SECONDS).await {
        Ok(url) => url,
        Err(e) => {
            warn!("Signing URL for {} failed, using public URL: {}", path, e);
            blobs.public_url(path)
        }
    }
}

struct StoredImage {
    url: String,
    // None when the blob write failed and the image went out inline.
    record: Option<(String, String, String)>,
}

/// Materializes image-capable chat output: binaries are persisted before any
/// URL is handed out, each persisted segment becomes its own history record,
/// and token usage rides along verbatim.
pub async fn materialize_chat_output(
    output: &ModelOutput,
    session_id: Uuid,
    records: &dyn RecordStore,
    blobs: &dyn BlobStore,
) -> Result<NormalizedResponse, ChatError> {
    let usage_metadata = match &output.usage {
        Some(usage) => json!({ "usage": usage }),
        None => json!({}),
    };

    let mut texts: Vec<&str> = Vec::new();
    let mut images: Vec<StoredImage> = Vec::new();

    for part in &output.parts {
        match part {
            OutputPart::Text(text) => texts.push(text),
            OutputPart::InlineBinary { mime_type, bytes } => {
                let (path, file_name) = storage_path(session_id, "response", "png");
                match blobs.put(&path, bytes.clone(), mime_type).await {
                    Ok(()) => {
                        let url = retrieval_url(blobs, &path).await;
                        images.push(StoredImage {
                            url,
                            record: Some((path, file_name, mime_type.clone())),
                        });
                    }
                    Err(e) => {
                        error!("Failed to store response image: {}", e);
                        // Deliver inline rather than dropping the artifact.
                        // With no durable path there is nothing to record.
                        images.push(StoredImage {
                            url: format!("data:{};base64,{}", mime_type, BASE64.encode(bytes)),
                            record: None,
                        });
                    }
                }
            }
        }
    }

    let mut response = NormalizedResponse {
        usage: output.usage.clone(),
        ..Default::default()
    };

    if !texts.is_empty() {
        let combined = texts.join("\n");
        records
            .append_message(&NewMessage {
                session_id,
                role: Role::Model,
                content: Some(combined.clone()),
                message_type: MessageType::Text,
                file_path: None,
                file_name: None,
                file_type: None,
                metadata: usage_metadata.clone(),
            })
            .await?;
        response.text = Some(combined);
    }

    for image in &images {
        if let Some((path, file_name, mime_type)) = &image.record {
            records
                .append_message(&NewMessage {
                    session_id,
                    role: Role::Model,
                    content: None,
                    message_type: MessageType::Image,
                    file_path: Some(path.clone()),
                    file_name: Some(file_name.clone()),
                    file_type: Some(mime_type.clone()),
                    metadata: usage_metadata.clone(),
                })
                .await?;
        }
    }

    if !images.is_empty() {
        response.images = Some(images.into_iter().map(|image| image.url).collect());
    }

    Ok(response)
}

/// Materializes a stateless image-generation result. The record write sits
/// between the blob write and the URL derivation so a response URL always
/// refers to a durable, recorded artifact.
pub async fn materialize_generated_image(
    bytes: Vec<u8>,
    session_id: Uuid,
    records: &dyn RecordStore,
    blobs: &dyn BlobStore,
) -> Result<NormalizedResponse, ChatError> {
    let (path, file_name) = storage_path(session_id, "generated", "png");

    match blobs.put(&path, bytes.clone(), "image/png").await {
        Ok(()) => {
            records
                .append_message(&NewMessage {
                    session_id,
                    role: Role::Model,
                    content: None,
                    message_type: MessageType::Image,
                    file_path: Some(path.clone()),
                    file_name: Some(file_name),
                    file_type: Some("image/png".to_string()),
                    metadata: json!({}),
                })
                .await?;

            Ok(NormalizedResponse {
                image: Some(retrieval_url(blobs, &path).await),
                is_stored_image: Some(true),
                ..Default::default()
            })
        }
        Err(e) => {
            error!("Failed to store generated image: {}", e);
            Ok(NormalizedResponse {
                image: Some(format!("data:image/png;base64,{}", BASE64.encode(&bytes))),
                is_stored_image: Some(false),
                ..Default::default()
            })
        }
    }
}
