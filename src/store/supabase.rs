use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::config::config::SupabaseConfig;
use crate::store::models::{AuthUser, MessageRecord, NewMessage, Session};
use crate::store::{BlobStore, RecordStore, StoreError, TokenVerifier};

const STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for the managed record/blob/auth backend. One instance serves
/// all three capabilities; it is shared process-wide behind `Arc`s.
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    anon_key: String,
    bucket: String,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Self {
        info!("Connecting to record store at {}", config.url);
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            bucket: config.storage_bucket.clone(),
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .timeout(STORE_TIMEOUT)
    }

    async fn check(response: Response, context: &str) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(StoreError::Api(format!("{} {}: {}", context, status, text)))
    }

    async fn rpc(&self, name: &str, args: Value) -> Result<Value, StoreError> {
        let response = self
            .authed(
                self.client
                    .post(format!("{}/rest/v1/rpc/{}", self.base_url, name)),
            )
            .json(&args)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let response = Self::check(response, name).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn fetch_user(&self, auth_user_id: &str) -> Result<Option<Uuid>, StoreError> {
        let response = self
            .authed(self.client.get(format!(
                "{}/rest/v1/users?select=id&user_id=eq.{}&limit=1",
                self.base_url, auth_user_id
            )))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let rows: Vec<Value> = Self::check(response, "users")
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        match rows.first().and_then(|row| row.get("id")).and_then(Value::as_str) {
            Some(id) => id
                .parse()
                .map(Some)
                .map_err(|e: uuid::Error| StoreError::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    async fn fetch_session(
        &self,
        session_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Session>, StoreError> {
        let response = self
            .authed(self.client.get(format!(
                "{}/rest/v1/chat_sessions?select=id,model&id=eq.{}&user_id=eq.{}&limit=1",
                self.base_url, session_id, owner_id
            )))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let mut rows: Vec<Session> = Self::check(response, "chat_sessions")
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    async fn list_sessions(&self, owner_id: Uuid) -> Result<Vec<Value>, StoreError> {
        // The summaries view carries UI-facing columns (pin state, last
        // activity, counts); rows pass through to the client untouched.
        let response = self
            .authed(self.client.get(format!(
                "{}/rest/v1/chat_session_summaries?select=*&user_id=eq.{}&order=is_pinned.desc,last_message_at.desc",
                self.base_url, owner_id
            )))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Self::check(response, "chat_session_summaries")
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn create_session(
        &self,
        owner_id: Uuid,
        title: &str,
        model: &str,
    ) -> Result<Uuid, StoreError> {
        let value = self
            .rpc(
                "create_chat_session",
                json!({
                    "p_user_id": owner_id,
                    "p_title": title,
                    "p_model": model,
                }),
            )
            .await?;

        value
            .as_str()
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| StoreError::Decode(format!("unexpected session id: {}", value)))
    }

    async fn append_message(&self, message: &NewMessage) -> Result<Uuid, StoreError> {
        let value = self
            .rpc(
                "add_chat_message",
                json!({
                    "p_session_id": message.session_id,
                    "p_role": message.role,
                    "p_content": message.content,
                    "p_message_type": message.message_type,
                    "p_file_path": message.file_path,
                    "p_file_name": message.file_name,
                    "p_file_type": message.file_type,
                    "p_metadata": message.metadata,
                }),
            )
            .await?;

        value
            .as_str()
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| StoreError::Decode(format!("unexpected message id: {}", value)))
    }

    async fn fetch_history(&self, session_id: Uuid) -> Result<Vec<MessageRecord>, StoreError> {
        let value = self
            .rpc("get_chat_history", json!({ "p_session_id": session_id }))
            .await?;

        serde_json::from_value(value).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn update_title(&self, session_id: Uuid, title: &str) -> Result<(), StoreError> {
        self.rpc(
            "update_chat_session_title",
            json!({ "p_session_id": session_id, "p_title": title }),
        )
        .await?;
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<(), StoreError> {
        self.rpc("delete_chat_session", json!({ "p_session_id": session_id }))
            .await?;
        Ok(())
    }

    async fn list_file_paths(&self, session_id: Uuid) -> Result<Vec<String>, StoreError> {
        let response = self
            .authed(self.client.get(format!(
                "{}/rest/v1/chat_messages?select=file_path&session_id=eq.{}&file_path=not.is.null",
                self.base_url, session_id
            )))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let rows: Vec<Value> = Self::check(response, "chat_messages")
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get("file_path").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }
}

#[async_trait]
impl BlobStore for SupabaseStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, mime_type: &str) -> Result<(), StoreError> {
        let response = self
            .authed(self.client.post(format!(
                "{}/storage/v1/object/{}/{}",
                self.base_url, self.bucket, path
            )))
            .header("Content-Type", mime_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Self::check(response, "storage upload").await?;
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl_seconds: u32) -> Result<String, StoreError> {
        let response = self
            .authed(self.client.post(format!(
                "{}/storage/v1/object/sign/{}/{}",
                self.base_url, self.bucket, path
            )))
            .json(&json!({ "expiresIn": ttl_seconds }))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let body: Value = Self::check(response, "storage sign")
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        // The sign endpoint answers with a path relative to /storage/v1.
        body.get("signedURL")
            .and_then(Value::as_str)
            .map(|signed| format!("{}/storage/v1{}", self.base_url, signed))
            .ok_or_else(|| StoreError::Decode("missing signedURL".to_string()))
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .authed(self.client.get(format!(
                "{}/storage/v1/object/authenticated/{}/{}",
                self.base_url, self.bucket, path
            )))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let bytes = Self::check(response, "storage download")
            .await?
            .bytes()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StoreError> {
        let response = self
            .authed(
                self.client
                    .delete(format!("{}/storage/v1/object/{}", self.base_url, self.bucket)),
            )
            .json(&json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Self::check(response, "storage remove").await?;
        Ok(())
    }
}

#[async_trait]
impl TokenVerifier for SupabaseStore {
    async fn verify(&self, token: &str) -> Result<Option<AuthUser>, StoreError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .timeout(STORE_TIMEOUT)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED
            || response.status() == StatusCode::FORBIDDEN
        {
            return Ok(None);
        }

        let user: AuthUser = Self::check(response, "auth user")
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(Some(user))
    }
}
