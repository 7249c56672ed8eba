pub mod models;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use models::{AuthUser, MessageRecord, NewMessage, Session};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("Store Error: {0}")]
    Api(String),
    #[error("Malformed store response: {0}")]
    Decode(String),
}

/// Session and message rows. Records are append-only; only bulk session
/// deletion removes them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Resolves the internal user id for an auth-service identity.
    async fn fetch_user(&self, auth_user_id: &str) -> Result<Option<Uuid>, StoreError>;

    /// Returns the session only when it belongs to `owner_id`.
    async fn fetch_session(
        &self,
        session_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Session>, StoreError>;

    async fn list_sessions(&self, owner_id: Uuid) -> Result<Vec<serde_json::Value>, StoreError>;

    async fn create_session(
        &self,
        owner_id: Uuid,
        title: &str,
        model: &str,
    ) -> Result<Uuid, StoreError>;

    async fn append_message(&self, message: &NewMessage) -> Result<Uuid, StoreError>;

    async fn fetch_history(&self, session_id: Uuid) -> Result<Vec<MessageRecord>, StoreError>;

    async fn update_title(&self, session_id: Uuid, title: &str) -> Result<(), StoreError>;

    async fn delete_session(&self, session_id: Uuid) -> Result<(), StoreError>;

    /// File paths referenced by a session's messages, for storage cleanup.
    async fn list_file_paths(&self, session_id: Uuid) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>, mime_type: &str) -> Result<(), StoreError>;

    async fn signed_url(&self, path: &str, ttl_seconds: u32) -> Result<String, StoreError>;

    /// Public URLs are derived locally and never fail.
    fn public_url(&self, path: &str) -> String;

    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    async fn remove(&self, paths: &[String]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Ok(None) means the token was rejected; Err means the auth service
    /// itself was unreachable.
    async fn verify(&self, token: &str) -> Result<Option<AuthUser>, StoreError>;
}
