pub mod gemini;
pub mod models;

use async_trait::async_trait;
use thiserror::Error;

use crate::chat::turns::Turn;
use models::{ModelInfo, ModelOutput};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("API Error: {0}")]
    Api(String),
    #[error("Rate Limited")]
    RateLimited,
    #[error("The model returned no content")]
    EmptyResponse,
}

/// The generative backend as the rest of the server sees it. Calls are not
/// retried; generation is not idempotent.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Multi-turn generation over the full context window.
    async fn generate_content(&self, model: &str, turns: &[Turn])
        -> Result<ModelOutput, ModelError>;

    /// Stateless single-prompt image synthesis. Returns PNG bytes.
    async fn generate_image(&self, model: &str, prompt: &str) -> Result<Vec<u8>, ModelError>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError>;
}
