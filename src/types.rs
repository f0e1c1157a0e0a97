//! Crate-wide error taxonomy and the chunk text unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors surfaced by the chunking, embedding, and retrieval pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// A scraped post is missing required fields or carries a malformed URL.
    #[error("invalid post: {0}")]
    InvalidPost(String),

    /// Chunk construction or splitting failed.
    #[error("chunking failed: {0}")]
    Chunking(String),

    /// The embedding service returned an error or an unusable response.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The generation service returned an error or an unusable response.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Persisted artifacts could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem error outside the persisted stores.
    #[error("io error: {0}")]
    Io(String),

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}

/// An immutable text unit produced by the chunk builder.
///
/// The first line is always a provenance tag of the form `<kind|identifier>`;
/// everything after it is the chunk body. Chunks serialize transparently as
/// strings so the persisted chunk list is a plain JSON array of text blobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chunk {
    text: String,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Full chunk text, provenance tag line included.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The leading provenance tag line.
    pub fn tag_line(&self) -> &str {
        self.text.lines().next().unwrap_or("")
    }

    /// Everything after the provenance tag line.
    pub fn body(&self) -> &str {
        match self.text.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        }
    }

    /// Chunk length in characters, the unit the split thresholds are set in.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
