pub mod capability;
pub mod dispatch;
pub mod history;
pub mod materialize;
pub mod turns;

use thiserror::Error;
use tracing::error;

use crate::genai::ModelError;
use crate::store::StoreError;

/// Request-level failure taxonomy. Upstream causes are logged where the
/// conversion happens; callers only ever see the generic message.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error("Access to this session is denied")]
    Authorization,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        error!("Store call failed: {}", err);
        ChatError::Upstream(err.to_string())
    }
}

impl From<ModelError> for ChatError {
    fn from(err: ModelError) -> Self {
        error!("Model call failed: {}", err);
        ChatError::Upstream(err.to_string())
    }
}
