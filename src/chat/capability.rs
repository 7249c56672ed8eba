/// The one chat model whose responses can carry inline images.
const IMAGE_CHAT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Which of the three response pipelines a model identifier maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityClass {
    ImageGeneration,
    ImageCapableChat,
    TextChat,
}

/// Total, case-insensitive mapping from model identifier to pipeline.
/// Unknown or empty identifiers fall back to plain text chat.
pub fn classify(model_id: &str) -> CapabilityClass {
    let normalized = model_id.trim().to_ascii_lowercase();

    if normalized.starts_with("imagen") {
        CapabilityClass::ImageGeneration
    } else if normalized == IMAGE_CHAT_MODEL {
        CapabilityClass::ImageCapableChat
    } else {
        CapabilityClass::TextChat
    }
}
