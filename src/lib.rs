//! Retrieval-augmented question answering over forum threads and course notes.
//!
//! ```text
//! posts.json ──► forum::PostGraph ──► chunking::builder ──┐
//!                                                         ├─► Vec<Chunk>
//! course markdown folder ──► chunking (markdown pass) ────┘
//!
//! Vec<Chunk> ──► chunking::splitter ──► embeddings::batch ──► stores::EmbeddingStore
//!
//! query ──► embeddings (query vector) ──► retrieval::top_k ──► context::ContextAssembler
//!                                                                      │
//!                                  assistant::Assistant ◄──────────────┘
//!                                  (prompt assembly + generation boundary)
//! ```
//!
pub mod assistant;
pub mod chunking;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod forum;
pub mod generation;
pub mod retrieval;
pub mod stores;
pub mod types;

pub use chunking::{BuildContext, ImageCaptions, build_chunks, split_oversized};
pub use types::{Chunk, RagError};
