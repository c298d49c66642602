//! Vectorizer server binary
//!
//! Run with: cargo run -p vectorizer --bin vectorizer-server -- --config vectorizer.toml

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vectorizer::{
    config::{EmbeddingBackend, StoreBackend, VectorizerConfig},
    VectorizerServer,
};

#[derive(Parser, Debug)]
#[command(name = "vectorizer-server", version, about = "PDF vectorization service")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "VECTORIZER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vectorizer=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = VectorizerConfig::load(args.config.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embeddings: {:?} ({} dimensions)", config.embeddings.provider, config.embeddings.dimensions);
    tracing::info!("  - Chunk size: {} (overlap {})", config.chunking.chunk_size, config.chunking.chunk_overlap);
    match config.vector_db.backend {
        StoreBackend::Sqlite => tracing::info!(
            "  - Collection: {} in {}",
            config.vector_db.collection,
            config.vector_db.database_file().display()
        ),
        StoreBackend::Memory => tracing::info!("  - Collection: {} (in memory)", config.vector_db.collection),
    }

    if config.embeddings.provider == EmbeddingBackend::Ollama {
        tracing::info!("Checking Ollama at {}...", config.ollama.base_url);
        let client = reqwest::Client::new();
        match client.get(format!("{}/api/tags", config.ollama.base_url)).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("Ollama is running");
            }
            _ => {
                tracing::warn!("Ollama not available at {}", config.ollama.base_url);
                tracing::warn!("  Start it with: ollama serve");
                tracing::warn!("  Pull the model: ollama pull {}", config.ollama.embed_model);
            }
        }
    }

    let server = VectorizerServer::new(config).await?;

    tracing::info!("Health: http://{}/health", server.address());
    tracing::info!("API info: http://{}/api/info", server.address());

    server.start().await?;

    Ok(())
}
