//! Chunk construction and post-processing.
//!
//! The builder turns the reply-threaded post list plus a folder of course
//! markdown documents into provenance-tagged [`Chunk`](crate::types::Chunk)s,
//! guaranteeing each post lands in at most one forum chunk. The splitter then
//! bounds every chunk's size without losing the provenance tag line.

pub mod builder;
pub mod provenance;
pub mod splitter;

pub use builder::{
    BuildContext, ImageCaptions, accepted_answer_chunks, build_chunks, course_content_chunks,
    direct_reply_chunks, leftover_topic_chunks,
};
pub use provenance::{SourceKind, SourceTag, extract_tags, source_urls};
pub use splitter::split_oversized;
