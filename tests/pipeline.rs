//! End-to-end pipeline tests over a small fixture corpus: chunk
//! construction, oversized-chunk splitting, embedding with persistence, and
//! query answering with link resolution. Everything runs against the
//! deterministic mock providers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use threadrag::assistant::{Assistant, QueryRequest, caption_posts};
use threadrag::chunking::{ImageCaptions, build_chunks, split_oversized};
use threadrag::config::PipelineConfig;
use threadrag::context::ContextAssembler;
use threadrag::embeddings::{MockEmbeddingProvider, embed_chunks};
use threadrag::forum::Post;
use threadrag::generation::MockGenerator;
use threadrag::stores::{EmbeddingStore, load_chunks, save_chunks};
use threadrag::types::Chunk;

fn post(topic: u32, number: u32, reply_to: Option<u32>, markdown: &str) -> Post {
    Post {
        post_url: format!("https://forum.example.com/t/some-topic/{topic}/{number}"),
        topic_title: format!("Topic {topic}"),
        markdown: markdown.to_string(),
        user_title: None,
        post_number: number,
        reply_count: 0,
        reply_to_post_number: reply_to,
        accepted_answer: false,
        image_urls: Vec::new(),
    }
}

/// Two forum topics with reply structure, one accepted-answer topic, two
/// lone starters (one oversized), plus a two-document course folder.
fn fixture_posts() -> Vec<Post> {
    let mut posts = Vec::new();

    // Topic 200: starter, a reply-target second post, three direct replies
    // to it (one faculty-titled).
    posts.push(post(200, 1, None, "how should we configure the container?"));
    let mut target = post(200, 2, Some(1), "here is my configuration attempt");
    target.reply_count = 3;
    posts.push(target);
    posts.push(post(200, 3, Some(2), "same problem here"));
    let mut faculty = post(200, 4, Some(2), "mount the volume read-only");
    faculty.user_title = Some("Course TA".to_string());
    posts.push(faculty);
    posts.push(post(200, 5, Some(2), "that fixed it for me"));

    // Topic 171: starter with an accepted answer among its replies.
    let mut starter = post(171, 1, None, "when is the project deadline?");
    starter.reply_count = 2;
    posts.push(starter);
    let mut accepted = post(171, 2, Some(1), "the deadline is friday midnight");
    accepted.accepted_answer = true;
    posts.push(accepted);
    posts.push(post(171, 3, Some(1), "thanks!"));

    // Topic 99: lone starter, nothing else.
    posts.push(post(99, 1, None, "is attendance mandatory?"));

    // Topic 300: lone starter whose body forces the splitter to engage.
    posts.push(post(300, 1, None, &"details about the grading rubric. ".repeat(80)));

    posts
}

async fn write_course_folder(dir: &Path) {
    tokio::fs::write(
        dir.join("docker.md"),
        "# Docker\n\nContainers package the toolchain for grading.\n",
    )
    .await
    .unwrap();
    tokio::fs::write(
        dir.join("apache.md"),
        "# Apache\n\nServe the course site locally for testing.\n",
    )
    .await
    .unwrap();
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        forum_base_url: "https://forum.example.com".to_string(),
        course_base_url: "https://course.example.com/#/".to_string(),
        embed_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn chunks_containing<'a>(chunks: &'a [Chunk], needle: &str) -> Vec<&'a Chunk> {
    chunks
        .iter()
        .filter(|chunk| chunk.text().contains(needle))
        .collect()
}

#[tokio::test]
async fn construction_passes_cover_the_corpus_exactly_once() {
    let dir = tempdir().unwrap();
    write_course_folder(dir.path()).await;
    let posts = fixture_posts();
    let config = fast_config();

    let chunks = build_chunks(&posts, Some(dir.path()), &ImageCaptions::new(), &config)
        .await
        .unwrap();

    // Every chunk opens with a provenance tag line.
    for chunk in &chunks {
        let first = chunk.tag_line();
        assert!(
            first.starts_with("<original_post|")
                || first.starts_with("<reply|")
                || first.starts_with("<course-content|"),
            "unexpected tag line: {first}"
        );
    }

    // The faculty-titled reply is ordered before the student replies.
    let direct = chunks_containing(&chunks, "<original_post|200/2>");
    assert_eq!(direct.len(), 1);
    let text = direct[0].text();
    let faculty_at = text.find("<reply|200/4>").unwrap();
    assert!(faculty_at < text.find("<reply|200/3>").unwrap());
    assert!(faculty_at < text.find("<reply|200/5>").unwrap());

    // Each direct reply appears in exactly one forum chunk.
    for reply in ["<reply|200/3>", "<reply|200/4>", "<reply|200/5>"] {
        assert_eq!(chunks_containing(&chunks, reply).len(), 1, "{reply}");
    }

    // Accepted answer lands in the accepted-answer chunk for its topic and
    // nowhere else.
    let accepted = chunks_containing(&chunks, "<reply|171/2>");
    assert_eq!(accepted.len(), 1);
    assert!(accepted[0].text().contains("<original_post|171/1>"));

    // The lone starter yields a starter-only leftover chunk.
    let lone = chunks_containing(&chunks, "<original_post|99/1>");
    assert_eq!(lone.len(), 1);
    assert!(!lone[0].text().contains("<reply|"));

    // Course documents are processed in lexicographic filename order.
    let course_tags: Vec<&Chunk> = chunks
        .iter()
        .filter(|chunk| chunk.tag_line().starts_with("<course-content|"))
        .collect();
    assert!(!course_tags.is_empty());
    assert_eq!(course_tags[0].tag_line(), "<course-content|apache>");
}

#[tokio::test]
async fn oversized_chunks_are_split_and_keep_their_tag() {
    let posts = fixture_posts();
    let config = fast_config();
    let chunks = build_chunks(&posts, None, &ImageCaptions::new(), &config)
        .await
        .unwrap();

    let before = chunks_containing(&chunks, "<original_post|300/1>").len();
    assert_eq!(before, 1);

    let adjusted = split_oversized(chunks, &config).unwrap();
    let splits = chunks_containing(&adjusted, "<original_post|300/1>");
    assert!(splits.len() >= 2, "expected the long topic to be split");
    for split in &splits {
        assert_eq!(split.tag_line(), "<original_post|300/1>");
        assert!(split.char_count() <= 2000 + 500 + "<original_post|300/1>\n".len());
    }

    // Already-small chunks pass through byte for byte.
    let small: Vec<String> = adjusted
        .iter()
        .filter(|chunk| chunk.char_count() < config.split_threshold)
        .map(|chunk| chunk.text().to_string())
        .collect();
    let again = split_oversized(adjusted, &config).unwrap();
    for text in &small {
        assert!(again.iter().any(|chunk| chunk.text() == text));
    }
}

#[tokio::test]
async fn embed_persist_and_answer_round_trip() {
    let dir = tempdir().unwrap();
    let course_dir = dir.path().join("course");
    tokio::fs::create_dir_all(&course_dir).await.unwrap();
    write_course_folder(&course_dir).await;

    let posts = fixture_posts();
    let config = fast_config();
    let chunks = build_chunks(&posts, Some(&course_dir), &ImageCaptions::new(), &config)
        .await
        .unwrap();
    let chunks = split_oversized(chunks, &config).unwrap();

    let chunks_path = dir.path().join("chunks.json");
    save_chunks(&chunks_path, &chunks).await.unwrap();

    let store_path = dir.path().join("embeddings.json");
    let provider = MockEmbeddingProvider::new();
    let mut store = EmbeddingStore::new();
    let embedded = embed_chunks(&provider, &chunks, &mut store, &store_path, &config)
        .await
        .unwrap();
    assert_eq!(embedded, chunks.len());

    // Reload everything the way the ask binary does.
    let chunks = load_chunks(&chunks_path).await.unwrap();
    let store = EmbeddingStore::load(&store_path).await.unwrap();
    assert_eq!(store.len(), chunks.len());
    assert!(store.get(0).unwrap().source.contains("forum.example.com/t/"));

    let assembler = ContextAssembler::new(
        chunks,
        posts,
        Some(course_dir),
        config.source_urls(),
    );
    let assistant = Assistant::new(
        Arc::new(provider),
        Arc::new(MockGenerator::new()),
        store,
        assembler,
        config.top_k,
    );

    let response = assistant
        .answer(&QueryRequest {
            question: Some("how do I configure the container?".to_string()),
            image: None,
        })
        .await
        .unwrap();

    assert!(response.answer.starts_with("mock answer"));
    assert!(!response.links.is_empty());

    // Links are deduplicated and every one resolved to non-empty text.
    let mut urls: Vec<&str> = response.links.iter().map(|l| l.url.as_str()).collect();
    urls.sort_unstable();
    urls.dedup();
    assert_eq!(urls.len(), response.links.len());
    assert!(response.links.iter().all(|link| !link.text.is_empty()));
}

#[tokio::test]
async fn caption_pre_pass_skips_posts_without_images() {
    let posts = fixture_posts();
    let client = reqwest::Client::new();
    let captions = caption_posts(&MockGenerator::new(), &client, &posts).await;
    // No fixture post carries image urls, so nothing gets captioned and no
    // network request is attempted.
    assert!(captions.is_empty());
}
