//! One-shot question answering against the persisted ingestion artifacts.
//!
//! Usage: `ask "how do I submit the project?" [image.png ...]`

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::fs;
use tracing_subscriber::FmtSubscriber;
use url::Url;

use threadrag::assistant::{Assistant, ImageInput, QueryRequest};
use threadrag::config::PipelineConfig;
use threadrag::context::ContextAssembler;
use threadrag::embeddings::{EmbeddingProvider, MockEmbeddingProvider, OpenAiEmbeddingProvider};
use threadrag::forum::load_posts;
use threadrag::generation::{Generator, MockGenerator, OpenAiChatGenerator};
use threadrag::stores::{EmbeddingStore, load_chunks};
use threadrag::types::RagError;

#[tokio::main]
async fn main() -> Result<(), RagError> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut args = env::args().skip(1);
    let Some(question) = args.next() else {
        eprintln!("usage: ask <question> [image-file ...]");
        std::process::exit(2);
    };
    let mut images = Vec::new();
    for path in args {
        let bytes = fs::read(&path).await?;
        images.push(BASE64.encode(bytes));
    }

    let config = PipelineConfig::from_env();
    let posts_path = env_path("THREADRAG_POSTS", "data/posts.json");
    let course_dir = env::var("THREADRAG_COURSE_DIR").ok().map(PathBuf::from);
    let chunks_path = env_path("THREADRAG_CHUNKS", "data/chunks.json");
    let store_path = env_path("THREADRAG_EMBEDDINGS", "data/embeddings.json");

    let posts = load_posts(&posts_path).await?;
    let chunks = load_chunks(&chunks_path).await?;
    let store = EmbeddingStore::load(&store_path).await?;
    if store.len() != chunks.len() {
        return Err(RagError::Storage(format!(
            "embedding store ({}) and chunk list ({}) are out of step, re-run ingest",
            store.len(),
            chunks.len()
        )));
    }

    let assembler = ContextAssembler::new(chunks, posts, course_dir, config.source_urls());
    let assistant = Assistant::new(
        embedding_provider()?,
        chat_generator()?,
        store,
        assembler,
        config.top_k,
    );

    let request = QueryRequest {
        question: Some(question),
        image: match images.len() {
            0 => None,
            1 => Some(ImageInput::Single(images.into_iter().next().unwrap())),
            _ => Some(ImageInput::Many(images)),
        },
    };

    let response = assistant.answer(&request).await?;
    println!("{}\n", response.answer);
    for link in &response.links {
        println!("  {}", link.url);
    }
    Ok(())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

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

fn chat_generator() -> Result<Arc<dyn Generator>, RagError> {
    match env::var("THREADRAG_CHAT_URL") {
        Ok(endpoint) => {
            let endpoint = Url::parse(&endpoint)
                .map_err(|err| RagError::Generation(format!("bad chat endpoint: {err}")))?;
            let model =
                env::var("THREADRAG_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
            let mut generator = OpenAiChatGenerator::new(endpoint, model)?;
            if let Ok(api_key) = env::var("THREADRAG_API_KEY") {
                generator = generator.with_api_key(api_key);
            }
            Ok(Arc::new(generator))
        }
        Err(_) => Ok(Arc::new(MockGenerator::new())),
    }
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
