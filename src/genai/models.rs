use serde::{Deserialize, Serialize};

/// One fragment of raw model output, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPart {
    Text(String),
    InlineBinary { mime_type: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone, Default)]
pub struct ModelOutput {
    pub parts: Vec<OutputPart>,
    pub usage: Option<TokenUsage>,
}

impl ModelOutput {
    /// Text segments joined with newlines, in emission order.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                OutputPart::Text(text) => Some(text.as_str()),
                OutputPart::InlineBinary { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Token accounting as the model reports it, passed through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates_token_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "supportedActions")]
    pub supported_actions: Vec<String>,
}
