//! Persisted pipeline artifacts: the chunk list and the embedding store.

pub mod chunks;
pub mod embedding;

pub use chunks::{export_raw_chunks, load_chunks, save_chunks};
pub use embedding::{EmbeddingRecord, EmbeddingStore};
