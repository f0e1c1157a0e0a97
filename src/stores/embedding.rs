//! Ordered embedding store.
//!
//! One record per chunk, held as explicit `(source, vector)` pairs rather
//! than index-aligned parallel arrays, so a partial write can never leave
//! sources and vectors drifted out of alignment. Record position is the
//! chunk index: record `i` belongs to chunk `i` of the persisted chunk list.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::types::RagError;

/// One stored embedding: the chunk's `|`-joined source-URL string and its
/// vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub source: String,
    pub vector: Vec<f32>,
}

/// Append-only, positionally indexed sequence of embedding records.
///
/// The store never calls the embedding service itself; a batch runner
/// appends results and decides when to persist.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingStore {
    records: Vec<EmbeddingRecord>,
}

impl EmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one record at the next position.
    pub fn append(&mut self, source: impl Into<String>, vector: Vec<f32>) {
        self.records.push(EmbeddingRecord {
            source: source.into(),
            vector,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&EmbeddingRecord> {
        self.records.get(index)
    }

    /// Serializes the full record sequence to `path`.
    pub async fn persist(&self, path: impl AsRef<Path>) -> Result<(), RagError> {
        write_records(path.as_ref(), &self.records).await
    }

    /// Serializes only the prefix `[0, last_good_index]` so a caller can
    /// detect and resume from the first unembedded chunk. An index at or
    /// past the end persists everything.
    pub async fn persist_partial(
        &self,
        path: impl AsRef<Path>,
        last_good_index: usize,
    ) -> Result<(), RagError> {
        let end = self.records.len().min(last_good_index.saturating_add(1));
        write_records(path.as_ref(), &self.records[..end]).await
    }

    /// Restores a previously persisted store. A missing file yields an empty
    /// store so a fresh batch and a resumed batch share one code path.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = fs::read_to_string(path).await?;
        let records: Vec<EmbeddingRecord> =
            serde_json::from_str(&data).map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(Self { records })
    }
}

async fn write_records(path: &Path, records: &[EmbeddingRecord]) -> Result<(), RagError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let serialized =
        serde_json::to_string(records).map_err(|err| RagError::Storage(err.to_string()))?;
    fs::write(path, serialized).await?;
    Ok(())
}
