//! Query-time orchestration.
//!
//! One question (optionally with images) flows through:
//!
//! ```text
//! decode images -> describe images -> embed query -> top-k retrieval
//!              -> prompt assembly -> answer generation -> link resolution
//! ```
//!
//! Image description is auxiliary enrichment and degrades gracefully; a
//! failed embedding propagates to the caller; a failed generation yields the
//! explicit fallback answer alongside the retrieved links.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chunking::ImageCaptions;
use crate::context::{ContextAssembler, ContextLink};
use crate::embeddings::EmbeddingProvider;
use crate::forum::Post;
use crate::generation::{Generator, ImageData};
use crate::retrieval::top_k;
use crate::stores::EmbeddingStore;
use crate::types::RagError;

/// Answer returned when the generation service fails after retrieval
/// succeeded.
pub const FALLBACK_ANSWER: &str =
    "I could not determine an answer from the available forum and course material.";

/// One or many base64-encoded images attached to a query.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageInput {
    Single(String),
    Many(Vec<String>),
}

impl ImageInput {
    fn as_slice(&self) -> &[String] {
        match self {
            ImageInput::Single(one) => std::slice::from_ref(one),
            ImageInput::Many(many) => many,
        }
    }
}

/// JSON contract of the hosting layer's query endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub image: Option<ImageInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub links: Vec<ContextLink>,
}

/// Ties the persisted artifacts and the two service boundaries together for
/// query answering.
pub struct Assistant {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn Generator>,
    store: EmbeddingStore,
    assembler: ContextAssembler,
    top_k: usize,
}

impl Assistant {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn Generator>,
        store: EmbeddingStore,
        assembler: ContextAssembler,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            generator,
            store,
            assembler,
            top_k,
        }
    }

    /// Answers one query end to end. Errors out only when the query cannot
    /// be embedded; generation failure degrades to [`FALLBACK_ANSWER`].
    pub async fn answer(&self, request: &QueryRequest) -> Result<QueryResponse, RagError> {
        let question = request.question.as_deref().unwrap_or("").trim();
        let images = decode_images(request.image.as_ref());

        let description = self.describe_images(&images, question).await;
        let query_content = match &description {
            Some(text) => format!("{question}\n{text}"),
            None => question.to_string(),
        };

        let query_vector = self.embedder.embed(&query_content).await?;
        let hits = top_k(&self.store, &query_vector, self.top_k);
        let indices: Vec<usize> = hits.iter().map(|hit| hit.index).collect();
        let sources: Vec<String> = hits.iter().map(|hit| hit.source.clone()).collect();
        info!(retrieved = hits.len(), "retrieved context for query");

        let prompt = answer_prompt(&query_content, &self.assembler.prompt_context(&indices));
        let answer = match self.generator.generate(&prompt, &images).await {
            Ok(text) => text,
            Err(err) => {
                error!(%err, "answer generation failed, returning fallback");
                FALLBACK_ANSWER.to_string()
            }
        };

        let links = self.assembler.resolve_links(&sources).await;
        Ok(QueryResponse { answer, links })
    }

    /// Asks the generator for a textual description of the query images.
    /// Any failure drops the description rather than the request.
    async fn describe_images(&self, images: &[ImageData], question: &str) -> Option<String> {
        if images.is_empty() {
            return None;
        }
        let prompt = image_description_prompt(question);
        match self.generator.generate(&prompt, images).await {
            Ok(text) => Some(format!("Image Description:\n{text}")),
            Err(err) => {
                warn!(%err, "image description failed, continuing with text only");
                None
            }
        }
    }
}

fn decode_images(input: Option<&ImageInput>) -> Vec<ImageData> {
    let Some(input) = input else {
        return Vec::new();
    };
    input
        .as_slice()
        .iter()
        .filter_map(|encoded| match BASE64.decode(encoded.trim()) {
            Ok(bytes) => Some(ImageData::new(bytes)),
            Err(err) => {
                warn!(%err, "dropping undecodable query image");
                None
            }
        })
        .collect()
}

fn answer_prompt(query_content: &str, context: &str) -> String {
    format!(
        "You are a retrieval-augmented assistant for an online degree program. \
         You are given context snippets drawn from the course forum and the \
         course notes. Answer the student query from the context only.\n\n\
         Notes on the context snippets:\n\
         - they may be fragmented, overlapping, or contain formatting noise\n\
         - URLs inside them are valid references\n\
         - image content from forum posts appears as textual descriptions\n\
         - if the context does not contain the answer, say you don't know \
         rather than inventing one\n\n\
         Images attached by the student, if any, accompany this prompt and \
         may contain the actual question.\n\n\
         STUDENT QUERY:\n{query_content}\n\n\
         CONTEXT SNIPPETS:\n{context}"
    )
}

fn image_description_prompt(question: &str) -> String {
    let question = if question.is_empty() {
        "No text provided."
    } else {
        question
    };
    format!(
        "A student attached one or more images to a forum-assistant query. \
         Write a textual description of the images so the query can be \
         embedded for retrieval. Use the query text to work out what is \
         being asked, describe any question visible in the images, and keep \
         the description under five sentences.\n\n\
         Query text:\n{question}"
    )
}

/// Pre-pass over the post corpus: fetches each post's images and asks the
/// generator to caption them, producing the caption map the chunk builder
/// consumes. Fetch or generation failures are logged and the post skipped.
pub async fn caption_posts(
    generator: &dyn Generator,
    client: &Client,
    posts: &[Post],
) -> ImageCaptions {
    let mut captions = ImageCaptions::new();
    for post in posts {
        if post.image_urls.is_empty() {
            continue;
        }
        let mut images = Vec::new();
        for url in &post.image_urls {
            match fetch_image(client, url).await {
                Ok(image) => images.push(image),
                Err(err) => warn!(url, %err, "image fetch failed, skipping"),
            }
        }
        if images.is_empty() {
            continue;
        }
        let prompt = format!(
            "Describe the images attached to this forum post so the post can \
             be indexed for retrieval. Keep the description under five \
             sentences.\n\nPost text:\n{}",
            post.markdown
        );
        match generator.generate(&prompt, &images).await {
            Ok(caption) => captions.insert(post.source_id(), caption),
            Err(err) => {
                warn!(post = post.source_id(), %err, "captioning failed, skipping post")
            }
        }
    }
    info!(captioned = captions.len(), "image caption pre-pass complete");
    captions
}

async fn fetch_image(client: &Client, url: &str) -> Result<ImageData, RagError> {
    let bytes = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    Ok(ImageData::new(bytes.to_vec()))
}
