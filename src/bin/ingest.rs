//! Builds the persisted artifacts the query path reads: the adjusted chunk
//! list, the raw-chunk export, and the embedding store.
//!
//! Resumable: on an embedding failure the successful prefix is persisted;
//! re-running picks up where the last run stopped.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use tracing_subscriber::FmtSubscriber;
use url::Url;

use threadrag::assistant::caption_posts;
use threadrag::chunking::{ImageCaptions, build_chunks, split_oversized};
use threadrag::config::PipelineConfig;
use threadrag::embeddings::{
    EmbeddingProvider, MockEmbeddingProvider, OpenAiEmbeddingProvider, embed_chunks,
};
use threadrag::forum::load_posts;
use threadrag::generation::OpenAiChatGenerator;
use threadrag::stores::{EmbeddingStore, export_raw_chunks, save_chunks};
use threadrag::types::RagError;

#[tokio::main]
async fn main() -> Result<(), RagError> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let started = Instant::now();

    let config = PipelineConfig::from_env();
    let posts_path = env_path("THREADRAG_POSTS", "data/posts.json");
    let course_dir = env::var("THREADRAG_COURSE_DIR").ok().map(PathBuf::from);
    let chunks_path = env_path("THREADRAG_CHUNKS", "data/chunks.json");
    let raw_chunks_path = env_path("THREADRAG_RAW_CHUNKS", "data/raw_chunks.md");
    let store_path = env_path("THREADRAG_EMBEDDINGS", "data/embeddings.json");

    let posts = load_posts(&posts_path).await?;
    println!("Loaded {} posts from {}", posts.len(), posts_path.display());

    let captions = match chat_generator()? {
        Some(generator) => {
            let client = Client::builder().use_rustls_tls().build()?;
            let captions = caption_posts(&generator, &client, &posts).await;
            println!("Captioned images for {} posts", captions.len());
            captions
        }
        None => {
            println!("No chat endpoint configured, skipping image captions");
            ImageCaptions::new()
        }
    };

    let chunks = build_chunks(&posts, course_dir.as_deref(), &captions, &config).await?;
    println!("Built {} chunks", chunks.len());
    export_raw_chunks(&raw_chunks_path, &chunks).await?;

    let chunks = split_oversized(chunks, &config)?;
    println!("{} chunks after oversized-chunk splitting", chunks.len());
    save_chunks(&chunks_path, &chunks).await?;

    let provider = embedding_provider()?;
    let mut store = EmbeddingStore::load(&store_path).await?;
    if !store.is_empty() {
        println!("Resuming: {} embeddings already persisted", store.len());
    }
    let embedded = embed_chunks(provider.as_ref(), &chunks, &mut store, &store_path, &config).await?;

    println!("\nIngestion complete");
    println!("  chunks          : {}", chunks.len());
    println!("  newly embedded  : {}", embedded);
    println!("  store size      : {}", store.len());
    println!("  chunk list      : {}", chunks_path.display());
    println!("  raw export      : {}", raw_chunks_path.display());
    println!("  embedding store : {}", store_path.display());
    println!("  duration        : {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

/// Real HTTP provider when an endpoint is configured, deterministic mock
/// otherwise (offline and test runs).
fn embedding_provider() -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    match env::var("THREADRAG_EMBED_URL") {
        Ok(endpoint) => {
            let endpoint = Url::parse(&endpoint)
                .map_err(|err| RagError::Embedding(format!("bad embedding endpoint: {err}")))?;
            let model = env::var("THREADRAG_EMBED_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string());
            let mut provider = OpenAiEmbeddingProvider::new(endpoint, model)?;
            if let Ok(api_key) = env::var("THREADRAG_API_KEY") {
                provider = provider.with_api_key(api_key);
            }
            Ok(Arc::new(provider))
        }
        Err(_) => Ok(Arc::new(MockEmbeddingProvider::new())),
    }
}

fn chat_generator() -> Result<Option<OpenAiChatGenerator>, RagError> {
    let Ok(endpoint) = env::var("THREADRAG_CHAT_URL") else {
        return Ok(None);
    };
    let endpoint = Url::parse(&endpoint)
        .map_err(|err| RagError::Generation(format!("bad chat endpoint: {err}")))?;
    let model = env::var("THREADRAG_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
    let mut generator = OpenAiChatGenerator::new(endpoint, model)?;
    if let Ok(api_key) = env::var("THREADRAG_API_KEY") {
        generator = generator.with_api_key(api_key);
    }
    Ok(Some(generator))
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
