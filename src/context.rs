//! Prompt-context assembly for retrieved chunks.
//!
//! Retrieval yields chunk indices and source strings; this module turns them
//! into the two things the answer layer needs:
//!
//! * a prompt context string (the retrieved chunk texts, blank-line joined),
//! * deduplicated [`ContextLink`]s resolving each source URL back to the
//!   full text it refers to (forum post markdown or course document).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::config::SourceUrls;
use crate::forum::Post;
use crate::types::Chunk;

/// A source URL paired with the full text it points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLink {
    pub url: String,
    pub text: String,
}

/// Resolves retrieval hits against the chunk list, the post corpus, and the
/// course-content folder.
pub struct ContextAssembler {
    chunks: Vec<Chunk>,
    posts: Vec<Post>,
    course_dir: Option<PathBuf>,
    urls: SourceUrls,
}

impl ContextAssembler {
    pub fn new(
        chunks: Vec<Chunk>,
        posts: Vec<Post>,
        course_dir: Option<PathBuf>,
        urls: SourceUrls,
    ) -> Self {
        Self {
            chunks,
            posts,
            course_dir,
            urls,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Chunk texts for the given store indices. Indices past the end of the
    /// chunk list are skipped (the store and chunk list are index aligned,
    /// so this only happens with a stale store on disk).
    pub fn snippets(&self, indices: &[usize]) -> Vec<&str> {
        indices
            .iter()
            .filter_map(|&index| self.chunks.get(index).map(Chunk::text))
            .collect()
    }

    /// The retrieved chunk texts joined into a single prompt context block.
    pub fn prompt_context(&self, indices: &[usize]) -> String {
        self.snippets(indices).join("\n\n\n")
    }

    /// Resolves `|`-joined source strings into deduplicated links, preserving
    /// first-seen order across all hits. A URL that cannot be resolved (no
    /// matching post, unreadable course file) is logged and skipped rather
    /// than failing the whole answer.
    pub async fn resolve_links(&self, sources: &[String]) -> Vec<ContextLink> {
        let mut seen: Vec<&str> = Vec::new();
        let mut links = Vec::new();
        for source in sources {
            for url in source.split('|').filter(|url| !url.is_empty()) {
                if seen.contains(&url) {
                    continue;
                }
                seen.push(url);
                match self.resolve_url(url).await {
                    Some(text) => links.push(ContextLink {
                        url: url.to_string(),
                        text,
                    }),
                    None => warn!(url, "could not resolve source url, skipping link"),
                }
            }
        }
        links
    }

    async fn resolve_url(&self, url: &str) -> Option<String> {
        if let Some(id) = url.strip_prefix(&self.urls.course_base) {
            return self.read_course_doc(id).await;
        }
        let prefix = format!("{}/t/", self.urls.forum_base);
        let source_id = url.strip_prefix(&prefix)?;
        self.posts
            .iter()
            .find(|post| post.source_id() == source_id)
            .map(|post| post.markdown.clone())
    }

    async fn read_course_doc(&self, id: &str) -> Option<String> {
        let dir = self.course_dir.as_deref()?;
        let path = course_doc_path(dir, id)?;
        match fs::read_to_string(&path).await {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(path = %path.display(), %err, "course document unreadable");
                None
            }
        }
    }
}

/// Maps a course document id back to its markdown file, rejecting ids that
/// would escape the course folder.
fn course_doc_path(dir: &Path, id: &str) -> Option<PathBuf> {
    if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
        return None;
    }
    Some(dir.join(format!("{id}.md")))
}
