pub mod middleware;
pub mod models;
pub mod routes;
pub mod upload;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::chat::ChatError;

impl ResponseError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::Authorization => StatusCode::FORBIDDEN,
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // Upstream detail stays in the server logs.
            ChatError::Upstream(_) => "Failed to process the chat request".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
