//! Answer-generation providers.
//!
//! Mirrors the embedding boundary: a small trait the assistant depends on,
//! a deterministic mock for tests, and an HTTP implementation speaking the
//! OpenAI-compatible `/v1/chat/completions` shape with inline image parts.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::types::RagError;

/// Raw bytes of one image attached to a generation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Sniffed MIME type, defaulting to PNG when the magic bytes are not
    /// recognized.
    pub fn mime_type(&self) -> &'static str {
        match self.bytes.as_slice() {
            [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
            [0x47, 0x49, 0x46, 0x38, ..] => "image/gif",
            [0x52, 0x49, 0x46, 0x46, ..] => "image/webp",
            _ => "image/png",
        }
    }

    /// `data:` URI with base64-encoded payload, as embedded in chat requests.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), BASE64.encode(&self.bytes))
    }
}

/// Text (and optionally image) in, generated answer text out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, images: &[ImageData]) -> Result<String, RagError>;
}

/// Canned-output generator for tests and offline runs. Echoes a digest of
/// the request so tests can assert on what reached the generator.
#[derive(Clone, Debug, Default)]
pub struct MockGenerator;

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, prompt: &str, images: &[ImageData]) -> Result<String, RagError> {
        Ok(format!(
            "mock answer ({} prompt chars, {} images)",
            prompt.chars().count(),
            images.len()
        ))
    }
}

/// Talks to any `/v1/chat/completions` endpoint speaking the OpenAI request
/// and response shape.
#[derive(Clone, Debug)]
pub struct OpenAiChatGenerator {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
}

impl OpenAiChatGenerator {
    /// `endpoint` is the full chat-completions URL.
    pub fn new(endpoint: Url, model: impl Into<String>) -> Result<Self, RagError> {
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            api_key: None,
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrlPart },
}

#[derive(Serialize)]
struct ImageUrlPart {
    url: String,
}

#[async_trait]
impl Generator for OpenAiChatGenerator {
    async fn generate(&self, prompt: &str, images: &[ImageData]) -> Result<String, RagError> {
        let mut content = vec![ContentPart::Text {
            text: prompt.to_string(),
        }];
        for image in images {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrlPart {
                    url: image.data_uri(),
                },
            });
        }

        let mut request = self.client.post(self.endpoint.clone()).json(&ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await?
            .error_for_status()
            .map_err(|err| RagError::Generation(format!("chat service rejected request: {err}")))?;

        let parsed: Value = response
            .json()
            .await
            .map_err(|err| RagError::Generation(format!("malformed chat response: {err}")))?;

        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RagError::Generation("response contained no answer text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_sniffing_recognizes_jpeg_and_falls_back_to_png() {
        let jpeg = ImageData::new(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(jpeg.mime_type(), "image/jpeg");

        let unknown = ImageData::new(vec![0x00, 0x01]);
        assert_eq!(unknown.mime_type(), "image/png");
    }

    #[test]
    fn data_uri_embeds_base64_payload() {
        let image = ImageData::new(vec![0x47, 0x49, 0x46, 0x38, 0x39]);
        let uri = image.data_uri();
        assert!(uri.starts_with("data:image/gif;base64,"));
        assert!(uri.len() > "data:image/gif;base64,".len());
    }

    #[tokio::test]
    async fn mock_generator_reports_request_shape() {
        let answer = MockGenerator::new()
            .generate("hello", &[ImageData::new(vec![1, 2, 3])])
            .await
            .unwrap();
        assert_eq!(answer, "mock answer (5 prompt chars, 1 images)");
    }
}
