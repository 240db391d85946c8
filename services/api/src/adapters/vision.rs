//! services/api/src/adapters/vision.rs
//!
//! This module contains the adapter for the vision model that reads uploaded
//! images. It implements the `OcrProvider` port from the `core` crate.

const EXTRACTION_INSTRUCTIONS: &str = r#"You are an OCR engine for math homework.

Transcribe EVERYTHING visible in the image:
- Copy all prose (question text, instructions, word problems) exactly as written.
- Write every mathematical expression in LaTeX wrapped in single $ signs, e.g. $x^2 + 3x = 10$.
- Keep the original line order. Do not add headings, commentary or markdown.

You must NOT solve, simplify, explain or answer anything. Only transcribe.
If the image holds no readable text or math, reply with an empty message."#;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequestArgs, ImageUrlArgs,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use math_tutor_core::{ImageUpload, OcrProvider, PortError, PortResult};
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `OcrProvider` using an OpenAI-compatible vision model.
#[derive(Clone)]
pub struct OpenAiVisionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiVisionAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Encodes the upload as an inline `data:` URI.
pub fn data_uri(image: &ImageUpload) -> String {
    format!("data:{};base64,{}", image.media_type, STANDARD.encode(&image.bytes))
}

/// Guesses a media type from the file extension, defaulting to PNG.
pub fn media_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/png",
    }
}

//=========================================================================================
// `OcrProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl OcrProvider for OpenAiVisionAdapter {
    async fn extract_text(&self, image: &ImageUpload) -> PortResult<String> {
        info!(file = %image.file_name, bytes = image.bytes.len(), "Sending image to vision model");

        let parts = vec![
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text("Transcribe this image.")
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(
                    ImageUrlArgs::default()
                        .url(data_uri(image))
                        .build()
                        .map_err(|e| PortError::Unexpected(e.to_string()))?,
                )
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(EXTRACTION_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(parts))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        // A reply without content means nothing was readable.
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!(chars = text.len(), "Vision model returned text");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn data_uri_inlines_base64_bytes() {
        let image = ImageUpload {
            file_name: "eq.png".into(),
            media_type: "image/png".into(),
            bytes: b"abc".to_vec(),
        };
        assert_eq!(data_uri(&image), "data:image/png;base64,YWJj");
    }

    #[test]
    fn media_type_follows_extension() {
        assert_eq!(media_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(media_type_for("scan.webp"), "image/webp");
        assert_eq!(media_type_for("no-extension"), "image/png");
    }
}
