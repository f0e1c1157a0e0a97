//! OpenAI-compatible HTTP embedding provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::EmbeddingProvider;
use crate::types::RagError;

/// Talks to any `/v1/embeddings` endpoint speaking the OpenAI request and
/// response shape (one input string per request, as the batch runner is
/// rate-limit sequential anyway).
#[derive(Clone, Debug)]
pub struct OpenAiEmbeddingProvider {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
}

impl OpenAiEmbeddingProvider {
    /// `endpoint` is the full embeddings URL, e.g.
    /// `https://api.example.com/openai/v1/embeddings`.
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

    /// Replaces the HTTP client (e.g. to share a configured client).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut request = self.client.post(self.endpoint.clone()).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await?
            .error_for_status()
            .map_err(|err| RagError::Embedding(format!("embedding service rejected request: {err}")))?;

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(format!("malformed embedding response: {err}")))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| RagError::Embedding("response contained no embedding".to_string()))
    }
}
