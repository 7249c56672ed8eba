use tracing::warn;

use crate::chat::turns::{ContentPart, Role, Turn};
use crate::store::models::{MessageRecord, MessageType};
use crate::store::BlobStore;

/// Rebuilds the model-input turns from the persisted session history.
///
/// User records contribute their text and, for image/file records, the
/// stored binary re-inlined with the recorded mime type. Model records
/// contribute text only; re-inlining generated images would amplify them
/// on every following turn. Records that end up with no parts are dropped.
pub async fn normalize(records: &[MessageRecord], blobs: &dyn BlobStore) -> Vec<Turn> {
    let mut turns = Vec::new();

    for record in records {
        match record.role {
            Role::User => {
                let mut turn = Turn::new(Role::User);

                if let Some(content) = record.content.as_deref().filter(|c| !c.is_empty()) {
                    turn.parts.push(ContentPart::Text(content.to_string()));
                }

                if let Some(path) = record.file_path.as_deref() {
                    if matches!(record.message_type, MessageType::Image | MessageType::File) {
                        match blobs.download(path).await {
                            Ok(bytes) => {
                                let mime_type = record
                                    .file_type
                                    .clone()
                                    .unwrap_or_else(|| "image/png".to_string());
                                turn.parts.push(ContentPart::InlineBinary { mime_type, bytes });
                            }
                            // A lost attachment degrades this one record, not
                            // the whole reconstruction.
                            Err(e) => warn!("Failed to load {} from storage: {}", path, e),
                        }
                    }
                }

                if !turn.is_empty() {
                    turns.push(turn);
                }
            }
            Role::Model => {
                if let Some(content) = record.content.as_deref().filter(|c| !c.is_empty()) {
                    turns.push(Turn::text(Role::Model, content));
                }
            }
        }
    }

    turns
}
