//! Sequential, resumable embedding batch runner.
//!
//! One embedding request per chunk, in chunk order, with a fixed delay
//! between requests to respect the service's rate limit. On any single-chunk
//! failure the successful prefix is persisted and the batch halts; a re-run
//! loads the persisted store and skips the already-embedded prefix.

use std::path::Path;

use tokio::time::sleep;
use tracing::{error, info};

use crate::chunking::source_urls;
use crate::config::PipelineConfig;
use crate::embeddings::EmbeddingProvider;
use crate::stores::EmbeddingStore;
use crate::types::{Chunk, RagError};

/// Embeds every chunk not yet present in `store`, appending one record per
/// chunk and persisting to `store_path`.
///
/// Returns the number of chunks embedded by this run. The store passed in
/// should be the result of [`EmbeddingStore::load`], so `store.len()` marks
/// the first unembedded chunk.
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    chunks: &[Chunk],
    store: &mut EmbeddingStore,
    store_path: &Path,
    config: &PipelineConfig,
) -> Result<usize, RagError> {
    let resume_from = store.len();
    if resume_from > chunks.len() {
        return Err(RagError::Storage(format!(
            "store holds {} records but only {} chunks were supplied",
            resume_from,
            chunks.len()
        )));
    }
    if resume_from > 0 {
        info!(skipped = resume_from, "resuming embedding batch");
    }

    let urls = config.source_urls();
    let mut embedded = 0usize;
    for (index, chunk) in chunks.iter().enumerate().skip(resume_from) {
        let source = source_urls(chunk.text(), &urls);
        match provider.embed(chunk.text()).await {
            Ok(vector) => {
                store.append(source, vector);
                embedded += 1;
                info!(index, "embedding generated for chunk");
            }
            Err(err) => {
                error!(index, %err, "embedding failed, persisting partial store");
                store.persist(store_path).await?;
                return Err(err);
            }
        }
        sleep(config.embed_delay).await;
    }

    store.persist(store_path).await?;
    info!(
        embedded,
        total = store.len(),
        "embedding batch complete"
    );
    Ok(embedded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            embed_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("<original_post|10/1>\nquestion"),
            Chunk::new("<reply|10/2>\nanswer"),
            Chunk::new("<course-content|notes>\nreference"),
        ]
    }

    /// Fails on the nth call, succeeds otherwise.
    struct FlakyProvider {
        calls: AtomicUsize,
        fail_at: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RagError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_at {
                Err(RagError::Embedding("service unavailable".to_string()))
            } else {
                Ok(vec![call as f32, 1.0])
            }
        }
    }

    #[tokio::test]
    async fn batch_embeds_all_chunks_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        let provider = MockEmbeddingProvider::new();
        let mut store = EmbeddingStore::new();

        let chunks = sample_chunks();
        let embedded = embed_chunks(&provider, &chunks, &mut store, &path, &fast_config())
            .await
            .unwrap();

        assert_eq!(embedded, 3);
        let loaded = EmbeddingStore::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.get(0).unwrap().source.contains("/t/10/1"));
    }

    #[tokio::test]
    async fn failure_halts_and_persists_successful_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        let provider = FlakyProvider {
            calls: AtomicUsize::new(0),
            fail_at: 2,
        };
        let mut store = EmbeddingStore::new();

        let chunks = sample_chunks();
        let result = embed_chunks(&provider, &chunks, &mut store, &path, &fast_config()).await;
        assert!(matches!(result, Err(RagError::Embedding(_))));

        let persisted = EmbeddingStore::load(&path).await.unwrap();
        assert_eq!(persisted.len(), 2);
    }

    #[tokio::test]
    async fn resume_skips_already_embedded_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        let chunks = sample_chunks();

        let failing = FlakyProvider {
            calls: AtomicUsize::new(0),
            fail_at: 2,
        };
        let mut store = EmbeddingStore::new();
        let _ = embed_chunks(&failing, &chunks, &mut store, &path, &fast_config()).await;

        let mut resumed = EmbeddingStore::load(&path).await.unwrap();
        assert_eq!(resumed.len(), 2);

        let provider = MockEmbeddingProvider::new();
        let embedded = embed_chunks(&provider, &chunks, &mut resumed, &path, &fast_config())
            .await
            .unwrap();

        assert_eq!(embedded, 1);
        assert_eq!(resumed.len(), chunks.len());
    }

    #[tokio::test]
    async fn store_larger_than_chunk_list_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        let mut store = EmbeddingStore::new();
        store.append("a", vec![0.0]);
        store.append("b", vec![0.0]);

        let chunks = vec![Chunk::new("<reply|1/2>\nonly one")];
        let result = embed_chunks(
            &MockEmbeddingProvider::new(),
            &chunks,
            &mut store,
            &path,
            &fast_config(),
        )
        .await;
        assert!(matches!(result, Err(RagError::Storage(_))));
    }
}
