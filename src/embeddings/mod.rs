//! Embedding providers and the sequential batch runner.
//!
//! The embedding service is an external boundary: the pipeline only relies
//! on the opaque `embed(text) -> vector` contract. [`MockEmbeddingProvider`]
//! gives deterministic vectors for tests and offline runs; the HTTP provider
//! in [`http`] speaks the OpenAI-compatible `/v1/embeddings` shape.

pub mod batch;
pub mod http;

use async_trait::async_trait;

use crate::types::RagError;

pub use batch::embed_chunks;
pub use http::OpenAiEmbeddingProvider;

/// Opaque embedding boundary: arbitrary-length text in, fixed-dimension
/// vector out.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

/// Deterministic hash-based provider for tests and offline pipelines.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dims: 8 }
    }

    pub fn with_dims(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        Ok(hash_to_vec(text, self.dims))
    }
}

fn hash_to_vec(text: &str, dims: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dims)
        .map(|i| {
            let bits = seed.rotate_left((i as u32) * 8) ^ ((i as u64) << 24);
            (bits as f32) / u32::MAX as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_provider_is_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let first = provider.embed("hello world").await.unwrap();
        let second = provider.embed("hello world").await.unwrap();
        let other = provider.embed("goodbye world").await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(first.len(), 8);
    }

    #[tokio::test]
    async fn mock_provider_honors_dimension_override() {
        let provider = MockEmbeddingProvider::with_dims(3);
        assert_eq!(provider.embed("x").await.unwrap().len(), 3);
    }
}
