#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    use talaria::chat::capability::{classify, CapabilityClass};
    use talaria::chat::history;
    use talaria::chat::turns::{
        build_user_turn, is_document_supported, Attachment, ContentPart, Role,
    };
    use talaria::store::models::{MessageRecord, MessageType};
    use talaria::store::{BlobStore, StoreError};

    // Blob store backed by a map, for exercising history reconstruction.
    struct MapBlobStore {
        files: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl BlobStore for MapBlobStore {
        async fn put(&self, _path: &str, _bytes: Vec<u8>, _mime: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn signed_url(&self, path: &str, _ttl: u32) -> Result<String, StoreError> {
            Ok(format!("https://signed.example/{}", path))
        }

        fn public_url(&self, path: &str) -> String {
            format!("https://public.example/{}", path)
        }

        async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| StoreError::Api(format!("no such object: {}", path)))
        }

        async fn remove(&self, _paths: &[String]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn text_record(role: Role, content: &str) -> MessageRecord {
        MessageRecord {
            role,
            content: Some(content.to_string()),
            message_type: MessageType::Text,
            file_path: None,
            file_name: None,
            file_type: None,
            metadata: json!({}),
            created_at: Utc::now(),
        }
    }

    fn file_record(
        role: Role,
        content: Option<&str>,
        message_type: MessageType,
        path: &str,
        mime: &str,
    ) -> MessageRecord {
        MessageRecord {
            role,
            content: content.map(str::to_string),
            message_type,
            file_path: Some(path.to_string()),
            file_name: Some("upload.bin".to_string()),
            file_type: Some(mime.to_string()),
            metadata: json!({}),
            created_at: Utc::now(),
        }
    }

    fn attachment(name: &str, mime: &str) -> Attachment {
        Attachment {
            original_name: name.to_string(),
            mime_type: mime.to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    // --- Capability classification ---

    #[test]
    fn test_classification_is_total() {
        assert_eq!(classify("imagen-2.0"), CapabilityClass::ImageGeneration);
        assert_eq!(
            classify("gemini-2.5-flash-image-preview"),
            CapabilityClass::ImageCapableChat
        );
        assert_eq!(classify("gemini-1.5-flash"), CapabilityClass::TextChat);
        assert_eq!(classify(""), CapabilityClass::TextChat);
        assert_eq!(classify("something-else"), CapabilityClass::TextChat);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("IMAGEN-3"), CapabilityClass::ImageGeneration);
        assert_eq!(
            classify("Gemini-2.5-Flash-Image-Preview"),
            CapabilityClass::ImageCapableChat
        );
        // A prefix of the image-preview id is not an exact match.
        assert_eq!(classify("gemini-2.5-flash"), CapabilityClass::TextChat);
    }

    #[test]
    fn test_classification_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(classify("imagen-2.0"), CapabilityClass::ImageGeneration);
            assert_eq!(classify("gemini-1.5-flash"), CapabilityClass::TextChat);
        }
    }

    // --- Turn building ---

    #[test]
    fn test_supported_documents_are_inlined() {
        let documents = [
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

        for mime in documents {
            assert!(is_document_supported(mime), "{} should be supported", mime);
            let turn = build_user_turn(None, &[attachment("doc", mime)]);
            assert_eq!(turn.parts.len(), 1, "{} should produce an inline part", mime);
        }
    }

    #[test]
    fn test_unsupported_types_are_dropped_from_turn() {
        for mime in ["application/zip", "video/mp4", "application/octet-stream"] {
            assert!(!is_document_supported(mime));
            let turn = build_user_turn(Some("look at this"), &[attachment("blob", mime)]);
            // Only the text part survives; the attachment stays out of the
            // model-facing turn.
            assert_eq!(turn.parts, vec![ContentPart::Text("look at this".to_string())]);
        }
    }

    #[test]
    fn test_text_precedes_attachments() {
        let turn = build_user_turn(Some("caption"), &[attachment("pic.png", "image/png")]);
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.parts.len(), 2);
        assert!(matches!(turn.parts[0], ContentPart::Text(_)));
        assert!(matches!(turn.parts[1], ContentPart::InlineBinary { .. }));
    }

    #[test]
    fn test_empty_submission_builds_empty_turn() {
        let turn = build_user_turn(None, &[]);
        assert!(turn.is_empty());

        let turn = build_user_turn(Some(""), &[]);
        assert!(turn.is_empty());
    }

    // --- History normalization ---

    #[tokio::test]
    async fn test_normalize_preserves_order_and_inlines_user_files() {
        let blobs = MapBlobStore {
            files: HashMap::from([("chat/s/one.png".to_string(), vec![9, 9, 9])]),
        };
        let records = vec![
            text_record(Role::User, "hello"),
            text_record(Role::Model, "hi there"),
            file_record(
                Role::User,
                Some("what is this?"),
                MessageType::Image,
                "chat/s/one.png",
                "image/png",
            ),
        ];

        let turns = history::normalize(&records, &blobs).await;

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0], talaria::chat::turns::Turn::text(Role::User, "hello"));
        assert_eq!(turns[1].role, Role::Model);
        assert_eq!(turns[2].role, Role::User);
        assert_eq!(turns[2].parts.len(), 2);
        assert_eq!(
            turns[2].parts[1],
            ContentPart::InlineBinary {
                mime_type: "image/png".to_string(),
                bytes: vec![9, 9, 9],
            }
        );
    }

    #[tokio::test]
    async fn test_normalize_skips_lost_attachments() {
        let blobs = MapBlobStore { files: HashMap::new() };
        let records = vec![
            file_record(
                Role::User,
                Some("see attached"),
                MessageType::File,
                "chat/s/gone.pdf",
                "application/pdf",
            ),
            // A file-only record whose blob is gone yields no parts at all
            // and disappears from the turn sequence.
            file_record(
                Role::User,
                None,
                MessageType::Image,
                "chat/s/also-gone.png",
                "image/png",
            ),
        ];

        let turns = history::normalize(&records, &blobs).await;

        assert_eq!(turns.len(), 1);
        assert_eq!(
            turns[0].parts,
            vec![ContentPart::Text("see attached".to_string())]
        );
    }

    #[tokio::test]
    async fn test_model_binaries_are_not_reinlined() {
        let blobs = MapBlobStore {
            files: HashMap::from([("chat/s/generated.png".to_string(), vec![7])]),
        };
        let records = vec![
            text_record(Role::User, "draw a cat"),
            // Model-authored image record: content is null, only the file
            // reference is stored.
            file_record(
                Role::Model,
                None,
                MessageType::Image,
                "chat/s/generated.png",
                "image/png",
            ),
        ];

        let turns = history::normalize(&records, &blobs).await;

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
    }
}
