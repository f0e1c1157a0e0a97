//! The four chunk-construction passes.
//!
//! Three passes walk the post graph in a fixed order (direct replies,
//! accepted answers, leftover topic-level replies); a fourth, independent
//! pass splits course markdown documents. Every pass appends to the chunk
//! list and extends the [`BuildContext`] registry, and later passes skip
//! posts already registered, so each post lands in at most one forum chunk.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use text_splitter::{ChunkConfig, MarkdownSplitter};
use tokio::fs;
use tracing::info;

use crate::chunking::provenance::{SourceKind, SourceTag};
use crate::config::PipelineConfig;
use crate::forum::{Post, PostGraph};
use crate::types::{Chunk, RagError};

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank-run pattern is valid"));

/// Registry of posts already incorporated into some chunk.
///
/// Membership is tracked by the immutable `topic-id/post-number` identifier,
/// never by structural comparison, and the context is threaded explicitly
/// through every pass rather than living in shared mutable state.
#[derive(Clone, Debug, Default)]
pub struct BuildContext {
    chunked_posts: HashSet<String>,
    chunked_replies: HashSet<String>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the post was already chunked as a pass target.
    pub fn post_is_chunked(&self, source_id: &str) -> bool {
        self.chunked_posts.contains(source_id)
    }

    /// Whether the post was already chunked in any role.
    pub fn is_chunked(&self, source_id: &str) -> bool {
        self.chunked_posts.contains(source_id) || self.chunked_replies.contains(source_id)
    }

    pub fn chunked_post_count(&self) -> usize {
        self.chunked_posts.len()
    }

    pub fn chunked_reply_count(&self) -> usize {
        self.chunked_replies.len()
    }

    fn record_post(&mut self, source_id: String) {
        self.chunked_posts.insert(source_id);
    }

    fn record_reply(&mut self, source_id: String) {
        self.chunked_replies.insert(source_id);
    }
}

/// Pre-computed image descriptions keyed by post `source_id`.
///
/// The captioning call is an external boundary; the builder only consumes
/// the map, keeping the construction passes pure and synchronous.
#[derive(Clone, Debug, Default)]
pub struct ImageCaptions {
    captions: HashMap<String, String>,
}

impl ImageCaptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_id: impl Into<String>, caption: impl Into<String>) {
        self.captions.insert(source_id.into(), caption.into());
    }

    pub fn get(&self, source_id: &str) -> Option<&str> {
        self.captions.get(source_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }
}

/// Collapses runs of two or more blank lines to a single blank line and
/// trims surrounding whitespace.
pub fn clean_text(markdown: &str) -> String {
    BLANK_RUNS.replace_all(markdown, "\n\n").trim().to_string()
}

fn post_section(kind: SourceKind, post: &Post, captions: &ImageCaptions) -> String {
    let tag = SourceTag::new(kind, post.source_id());
    let content = clean_text(&post.markdown);
    let image_text = match captions.get(&post.source_id()) {
        Some(caption) => format!("Image Description:\n{caption}\n"),
        None => String::new(),
    };
    format!("\n{tag}\n{content}\n{image_text}\n")
}

/// Pass 1: one chunk per reply-target post, containing the post and all of
/// its direct replies with faculty-titled authors ordered first (stable
/// within each group).
pub fn direct_reply_chunks(
    graph: &PostGraph<'_>,
    captions: &ImageCaptions,
    ctx: &mut BuildContext,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for post in graph.posts() {
        if post.is_topic_starter() || post.reply_count == 0 {
            continue;
        }
        let replies = graph.direct_replies(post);

        let mut ordered: Vec<&Post> = replies
            .iter()
            .copied()
            .filter(|reply| reply.has_author_title())
            .collect();
        ordered.extend(replies.iter().copied().filter(|r| !r.has_author_title()));

        let mut text = post_section(SourceKind::OriginalPost, post, captions);
        for reply in &ordered {
            text.push_str(&post_section(SourceKind::Reply, reply, captions));
        }

        ctx.record_post(post.source_id());
        for reply in &ordered {
            ctx.record_reply(reply.source_id());
        }
        info!(source = %post.source_id(), replies = ordered.len(), "direct-reply chunk created");
        chunks.push(Chunk::new(text.trim().to_string()));
    }
    chunks
}

/// Pass 2: one chunk per topic starter that has an accepted answer.
///
/// The pass is keyed by topic, not by post, so it may intentionally
/// re-include a reply the direct-reply pass already consumed.
pub fn accepted_answer_chunks(
    graph: &PostGraph<'_>,
    captions: &ImageCaptions,
    ctx: &mut BuildContext,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for post in graph.posts() {
        if !post.is_topic_starter() {
            continue;
        }
        let Some(answer) = graph.accepted_answer(post) else {
            continue;
        };

        let mut text = post_section(SourceKind::OriginalPost, post, captions);
        text.push_str(&post_section(SourceKind::Reply, answer, captions));

        ctx.record_post(post.source_id());
        ctx.record_reply(answer.source_id());
        info!(source = %post.source_id(), answer = %answer.source_id(), "accepted-answer chunk created");
        chunks.push(Chunk::new(text.trim().to_string()));
    }
    chunks
}

/// Pass 3: one chunk per still-unchunked topic starter, containing the
/// starter plus every topic-level reply not yet registered in any role.
/// An empty reply section is permitted and yields a starter-only chunk.
pub fn leftover_topic_chunks(
    graph: &PostGraph<'_>,
    captions: &ImageCaptions,
    ctx: &mut BuildContext,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for post in graph.posts() {
        if !post.is_topic_starter() || ctx.post_is_chunked(&post.source_id()) {
            continue;
        }
        let unchunked: Vec<&Post> = graph
            .topic_level_replies(post)
            .into_iter()
            .filter(|reply| !ctx.is_chunked(&reply.source_id()))
            .collect();

        let mut text = post_section(SourceKind::OriginalPost, post, captions);
        for reply in &unchunked {
            text.push_str(&post_section(SourceKind::Reply, reply, captions));
        }

        ctx.record_post(post.source_id());
        for reply in &unchunked {
            ctx.record_reply(reply.source_id());
        }
        info!(source = %post.source_id(), replies = unchunked.len(), "leftover topic chunk created");
        chunks.push(Chunk::new(text.trim().to_string()));
    }
    chunks
}

/// Markdown-document pass: splits every `.md` file in `folder` (lexicographic
/// filename order) with a structure-aware splitter and prefixes each split
/// with a `course-content` tag naming the file stem.
pub async fn course_content_chunks(
    folder: &Path,
    config: &PipelineConfig,
) -> Result<Vec<Chunk>, RagError> {
    let chunk_config = ChunkConfig::new(config.course_capacity)
        .with_overlap(config.course_overlap)
        .map_err(|err| RagError::Chunking(err.to_string()))?;
    let splitter = MarkdownSplitter::new(chunk_config);

    let mut names = Vec::new();
    let mut entries = fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".md") {
            names.push(name);
        }
    }
    names.sort();

    let mut chunks = Vec::new();
    for name in names {
        let text = fs::read_to_string(folder.join(&name)).await?;
        let stem = name.strip_suffix(".md").unwrap_or(&name);
        let tag = SourceTag::new(SourceKind::CourseContent, stem);
        let before = chunks.len();
        for split in splitter.chunks(&text) {
            chunks.push(Chunk::new(format!("{tag}\n{split}")));
        }
        info!(source = %tag, splits = chunks.len() - before, "course-content chunks created");
    }
    Ok(chunks)
}

/// Runs all four passes in order and returns the concatenated chunk list.
///
/// Posts are validated up front; a malformed record aborts construction
/// before any chunk is emitted.
pub async fn build_chunks(
    posts: &[Post],
    course_folder: Option<&Path>,
    captions: &ImageCaptions,
    config: &PipelineConfig,
) -> Result<Vec<Chunk>, RagError> {
    for post in posts {
        post.validate()?;
    }
    let graph = PostGraph::new(posts);
    let mut ctx = BuildContext::new();

    let mut chunks = direct_reply_chunks(&graph, captions, &mut ctx);
    chunks.extend(accepted_answer_chunks(&graph, captions, &mut ctx));
    chunks.extend(leftover_topic_chunks(&graph, captions, &mut ctx));
    if let Some(folder) = course_folder {
        chunks.extend(course_content_chunks(folder, config).await?);
    }

    info!(
        chunks = chunks.len(),
        chunked_posts = ctx.chunked_post_count(),
        chunked_replies = ctx.chunked_reply_count(),
        "chunk construction complete"
    );
    Ok(chunks)
}
