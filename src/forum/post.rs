//! The `Post` record produced by the forum scraper.
//!
//! Posts are created once by the scraping step and read-only thereafter. The
//! schema mirrors the scraper's JSON output; `load_posts` validates every
//! record up front so the construction passes can stay pure and infallible.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::types::RagError;

/// A single forum post inside a scraped time window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Canonical URL; the last two path segments are `topic-id/post-number`.
    pub post_url: String,
    pub topic_title: String,
    /// Cleaned body markdown (upload links already stripped by the scraper).
    pub markdown: String,
    /// Author title; `Some` non-empty marks privileged/faculty authorship.
    pub user_title: Option<String>,
    /// Position within the topic; 1 denotes the topic starter.
    pub post_number: u32,
    pub reply_count: u32,
    pub reply_to_post_number: Option<u32>,
    /// Set on the reply the forum accepted as the topic's solution.
    pub accepted_answer: bool,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl Post {
    /// Forum-relative identifier: the last two path segments of the
    /// canonical URL, i.e. `topic-id/post-number`.
    pub fn source_id(&self) -> String {
        let mut segments = self.post_url.trim_end_matches('/').rsplit('/');
        let number = segments.next().unwrap_or_default();
        let topic = segments.next().unwrap_or_default();
        format!("{topic}/{number}")
    }

    /// The topic identifier segment of the canonical URL.
    pub fn topic_id(&self) -> &str {
        let trimmed = self.post_url.trim_end_matches('/');
        let mut segments = trimmed.rsplit('/');
        segments.next();
        segments.next().unwrap_or_default()
    }

    pub fn is_topic_starter(&self) -> bool {
        self.post_number == 1
    }

    /// Whether the author carries a forum title (faculty/privileged flag).
    pub fn has_author_title(&self) -> bool {
        self.user_title
            .as_deref()
            .is_some_and(|title| !title.trim().is_empty())
    }

    /// Fails fast on records a chunk could not be built from.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.topic_title.trim().is_empty() {
            return Err(RagError::InvalidPost(format!(
                "post {} has an empty topic_title",
                self.post_url
            )));
        }
        if self.post_number == 0 {
            return Err(RagError::InvalidPost(format!(
                "post {} has post_number 0 (positions are 1-based)",
                self.post_url
            )));
        }
        let segments = self
            .post_url
            .trim_end_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .count();
        if segments < 2 {
            return Err(RagError::InvalidPost(format!(
                "post URL '{}' has no topic-id/post-number suffix",
                self.post_url
            )));
        }
        if self.is_topic_starter() && self.reply_to_post_number.is_some() {
            return Err(RagError::InvalidPost(format!(
                "topic starter {} carries a reply_to_post_number",
                self.post_url
            )));
        }
        Ok(())
    }
}

/// Loads and validates the scraper's `posts.json` output.
pub async fn load_posts(path: impl AsRef<Path>) -> Result<Vec<Post>, RagError> {
    let data = fs::read_to_string(path.as_ref()).await?;
    let posts: Vec<Post> =
        serde_json::from_str(&data).map_err(|err| RagError::InvalidPost(err.to_string()))?;
    for post in &posts {
        post.validate()?;
    }
    Ok(posts)
}
