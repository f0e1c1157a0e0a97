//! Exhaustive cosine-similarity retrieval.
//!
//! No approximate index: the corpus tops out at a few tens of thousands of
//! chunks, so a full scan over the store is both correct and fast enough.

use std::cmp::Ordering;

use crate::stores::EmbeddingStore;

/// One ranked retrieval result.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievalHit {
    /// Position of the record in the store (and of its chunk in the list).
    pub index: usize,
    /// The record's `|`-joined source-URL string.
    pub source: String,
    pub score: f32,
}

/// Ranks every stored record by cosine similarity to `query` and returns the
/// best `k`, descending, ties broken by lowest index. `k` is clamped to the
/// store size; an empty store or empty query yields an empty result.
pub fn top_k(store: &EmbeddingStore, query: &[f32], k: usize) -> Vec<RetrievalHit> {
    if store.is_empty() || query.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut hits: Vec<RetrievalHit> = store
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| RetrievalHit {
            index,
            source: record.source.clone(),
            score: cosine_similarity(query, &record.vector),
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.index.cmp(&b.index))
    });
    hits.truncate(k.min(store.len()));
    hits
}

/// `dot(a, b) / (||a|| * ||b||)` over full-precision vectors. Mismatched
/// dimensions or a zero-norm operand score 0.0 rather than poisoning the
/// ranking with NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
