use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde_json::{json, Value};

use crate::chat::turns::{ContentPart, Turn};
use crate::config::config::GeminiConfig;
use crate::genai::models::{ModelInfo, ModelOutput, OutputPart, TokenUsage};
use crate::genai::{GenerativeModel, ModelError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new(config.api_key.clone(), config.api_base.clone())
    }

    fn endpoint(&self, model: &str, action: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{}", trimmed)
        };
        format!("{}/{}:{}", self.base_url, model_path, action)
    }

    fn turn_to_value(turn: &Turn) -> Value {
        let parts: Vec<Value> = turn
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({ "text": text }),
                ContentPart::InlineBinary { mime_type, bytes } => json!({
                    "inlineData": {
                        "mimeType": mime_type,
                        "data": BASE64.encode(bytes),
                    }
                }),
            })
            .collect();

        json!({ "role": turn.role.as_str(), "parts": parts })
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, ModelError> {
        let response = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(ModelError::RateLimited);
            }
            return Err(ModelError::Api(format!("Gemini Error {}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        turns: &[Turn],
    ) -> Result<ModelOutput, ModelError> {
        let contents: Vec<Value> = turns.iter().map(Self::turn_to_value).collect();
        let body = json!({ "contents": contents });

        let response = self
            .post(&self.endpoint(model, "generateContent"), &body)
            .await?;

        let mut output = ModelOutput {
            parts: Vec::new(),
            usage: response
                .get("usageMetadata")
                .and_then(|usage| serde_json::from_value::<TokenUsage>(usage.clone()).ok()),
        };

        let parts = response["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        for part in parts {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                output.parts.push(OutputPart::Text(text.to_string()));
            } else if let Some(inline) = part
                .get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(Value::as_object)
            {
                let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
                if data.is_empty() {
                    continue;
                }
                let bytes = BASE64
                    .decode(data.as_bytes())
                    .map_err(|e| ModelError::Api(format!("image decode failed: {}", e)))?;
                let mime_type = inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(Value::as_str)
                    .unwrap_or("image/png")
                    .to_string();
                output.parts.push(OutputPart::InlineBinary { mime_type, bytes });
            }
        }

        if output.parts.is_empty() {
            return Err(ModelError::EmptyResponse);
        }

        Ok(output)
    }

    async fn generate_image(&self, model: &str, prompt: &str) -> Result<Vec<u8>, ModelError> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1 },
        });

        let response = self.post(&self.endpoint(model, "predict"), &body).await?;

        let data = response["predictions"][0]["bytesBase64Encoded"]
            .as_str()
            .ok_or(ModelError::EmptyResponse)?;

        BASE64
            .decode(data.as_bytes())
            .map_err(|e| ModelError::Api(format!("image decode failed: {}", e)))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        let response = self
            .client
            .get(format!("{}/models?pageSize=200", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("Gemini Error {}: {}", status, text)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let entries = body
            .get("models")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut models = Vec::new();
        for entry in &entries {
            let name = entry.get("name").and_then(Value::as_str).unwrap_or_default();
            let short = name.rsplit('/').next().unwrap_or(name);
            let lower = short.to_ascii_lowercase();
            if !(lower.starts_with("gemini") || lower.starts_with("imagen")) {
                continue;
            }
            models.push(ModelInfo {
                name: name.to_string(),
                display_name: entry
                    .get("displayName")
                    .and_then(Value::as_str)
                    .unwrap_or(short)
                    .to_string(),
                supported_actions: entry
                    .get("supportedGenerationMethods")
                    .and_then(Value::as_array)
                    .map(|methods| {
                        methods
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            });
        }

        models.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(models)
    }
}
