//! Pipeline configuration.
//!
//! Settings are resolved in two layers (later wins):
//!
//! 1. Compiled defaults matching the production deployment.
//! 2. `THREADRAG_*` environment variables (the binaries call
//!    `dotenvy::dotenv()` before reading these).

use std::env;
use std::time::Duration;

/// Base URLs used to turn provenance tags into fully qualified source links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceUrls {
    /// Forum root, e.g. `https://discourse.onlinedegree.iitm.ac.in`.
    pub forum_base: String,
    /// Course-content root including its fragment prefix, e.g.
    /// `https://tds.s-anand.net/#/`.
    pub course_base: String,
}

/// Tunable knobs for chunk construction, embedding, and retrieval.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub forum_base_url: String,
    pub course_base_url: String,
    /// Target capacity for markdown-document splits, in characters.
    pub course_capacity: usize,
    /// Overlap between consecutive markdown-document splits.
    pub course_overlap: usize,
    /// Chunks at or above this many characters are re-split.
    pub split_threshold: usize,
    /// Target capacity for oversized-chunk splits.
    pub split_capacity: usize,
    /// Overlap between consecutive oversized-chunk splits.
    pub split_overlap: usize,
    /// Fixed delay between consecutive embedding requests (rate limit).
    pub embed_delay: Duration,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            forum_base_url: "https://discourse.onlinedegree.iitm.ac.in".to_string(),
            course_base_url: "https://tds.s-anand.net/#/".to_string(),
            course_capacity: 1000,
            course_overlap: 200,
            split_threshold: 2000,
            split_capacity: 2000,
            split_overlap: 500,
            embed_delay: Duration::from_secs(1),
            top_k: 10,
        }
    }
}

impl PipelineConfig {
    /// Builds a configuration from compiled defaults plus `THREADRAG_*`
    /// environment overrides. Unparsable numeric overrides are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = env::var("THREADRAG_FORUM_BASE_URL") {
            config.forum_base_url = value;
        }
        if let Ok(value) = env::var("THREADRAG_COURSE_BASE_URL") {
            config.course_base_url = value;
        }
        if let Some(value) = env_usize("THREADRAG_COURSE_CAPACITY") {
            config.course_capacity = value;
        }
        if let Some(value) = env_usize("THREADRAG_COURSE_OVERLAP") {
            config.course_overlap = value;
        }
        if let Some(value) = env_usize("THREADRAG_SPLIT_THRESHOLD") {
            config.split_threshold = value;
        }
        if let Some(value) = env_usize("THREADRAG_SPLIT_CAPACITY") {
            config.split_capacity = value;
        }
        if let Some(value) = env_usize("THREADRAG_SPLIT_OVERLAP") {
            config.split_overlap = value;
        }
        if let Some(value) = env_usize("THREADRAG_EMBED_DELAY_MS") {
            config.embed_delay = Duration::from_millis(value as u64);
        }
        if let Some(value) = env_usize("THREADRAG_TOP_K") {
            config.top_k = value;
        }
        config
    }

    /// The URL bases used when rendering provenance tags as links.
    pub fn source_urls(&self) -> SourceUrls {
        SourceUrls {
            forum_base: self.forum_base_url.trim_end_matches('/').to_string(),
            course_base: self.course_base_url.clone(),
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}
