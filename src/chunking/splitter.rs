//! Second-pass splitter for oversized chunks.
//!
//! Splitting operates only on the body; the original provenance tag line is
//! re-prepended to every sub-chunk so provenance is never lost. The splitter
//! is generic (paragraph/sentence aware, not markdown-structure aware) and
//! applies uniformly to all provenance kinds.

use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::types::{Chunk, RagError};

/// Emits a new chunk list where every chunk shorter than the configured
/// threshold passes through unchanged and every other chunk is split into
/// capacity-bounded sub-chunks carrying the original tag line.
pub fn split_oversized(
    chunks: Vec<Chunk>,
    config: &PipelineConfig,
) -> Result<Vec<Chunk>, RagError> {
    let chunk_config = ChunkConfig::new(config.split_capacity)
        .with_overlap(config.split_overlap)
        .map_err(|err| RagError::Chunking(err.to_string()))?;
    let splitter = TextSplitter::new(chunk_config);

    let mut adjusted = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.char_count() < config.split_threshold {
            adjusted.push(chunk);
            continue;
        }

        let tag = chunk.tag_line().to_string();
        let before = adjusted.len();
        for split in splitter.chunks(chunk.body()) {
            adjusted.push(Chunk::new(format!("{tag}\n{split}")));
        }
        debug!(
            source = %tag,
            sub_chunks = adjusted.len() - before,
            "oversized chunk split"
        );
    }
    Ok(adjusted)
}
