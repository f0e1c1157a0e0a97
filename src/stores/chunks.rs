//! Chunk-list persistence.
//!
//! The adjusted chunk list is stored as a JSON array of text blobs, index
//! aligned with the embedding store. `export_raw_chunks` additionally writes
//! a divider-joined markdown file for human inspection of a pipeline run.

use std::path::Path;

use tokio::fs;

use crate::types::{Chunk, RagError};

/// Separator between chunks in the raw markdown export.
pub const CHUNK_DIVIDER: &str = "\n\n<!--divider-->\n\n";

/// Persists the chunk list as a JSON array of strings.
pub async fn save_chunks(path: impl AsRef<Path>, chunks: &[Chunk]) -> Result<(), RagError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let serialized =
        serde_json::to_string(chunks).map_err(|err| RagError::Storage(err.to_string()))?;
    fs::write(path, serialized).await?;
    Ok(())
}

/// Loads a persisted chunk list.
pub async fn load_chunks(path: impl AsRef<Path>) -> Result<Vec<Chunk>, RagError> {
    let data = fs::read_to_string(path.as_ref()).await?;
    serde_json::from_str(&data).map_err(|err| RagError::Storage(err.to_string()))
}

/// Writes the chunk list joined by [`CHUNK_DIVIDER`] for inspection.
pub async fn export_raw_chunks(path: impl AsRef<Path>, chunks: &[Chunk]) -> Result<(), RagError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let joined = chunks
        .iter()
        .map(Chunk::text)
        .collect::<Vec<_>>()
        .join(CHUNK_DIVIDER);
    fs::write(path, joined).await?;
    Ok(())
}
