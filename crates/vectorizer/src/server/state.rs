//! Application state for the vectorizer server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::{EmbeddingBackend, StoreBackend, VectorizerConfig};
use crate::error::{Error, Result};
use crate::ingestion::{DocumentPipeline, IngestionCoordinator};
use crate::providers::{
    EmbeddingProvider, HashingEmbedder, MemoryCollection, OllamaEmbedder, VectorCollection,
};
use crate::retrieval::ScopedStore;
use crate::storage::SqliteCollection;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: VectorizerConfig,
    /// Ingestion coordinator, owns the scoped store
    coordinator: IngestionCoordinator,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state from configuration
    pub async fn new(config: VectorizerConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.provider {
            EmbeddingBackend::Ollama => {
                tracing::info!(
                    "Using Ollama embeddings ({} at {})",
                    config.ollama.embed_model,
                    config.ollama.base_url
                );
                Arc::new(OllamaEmbedder::new(&config.ollama, config.embeddings.dimensions)?)
            }
            EmbeddingBackend::Hashing => {
                tracing::info!(
                    "Using hashing embeddings ({} dimensions)",
                    config.embeddings.dimensions
                );
                Arc::new(HashingEmbedder::new(config.embeddings.dimensions))
            }
        };

        let collection: Arc<dyn VectorCollection> = match config.vector_db.backend {
            StoreBackend::Sqlite => {
                let path = config.vector_db.database_file();
                let collection_name = config.vector_db.collection.clone();
                let opened = tokio::task::spawn_blocking(move || {
                    SqliteCollection::open(&path, &collection_name, embedder)
                })
                .await
                .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
                .map_err(|e| Error::store(e.kind(), e.to_string()))?;

                tracing::info!(
                    "Vector store: SQLite collection '{}' at {}",
                    config.vector_db.collection,
                    config.vector_db.database_file().display()
                );
                Arc::new(opened)
            }
            StoreBackend::Memory => {
                tracing::warn!("Vector store: in-memory collection, chunks are lost on restart");
                Arc::new(MemoryCollection::new(&config.vector_db.collection, embedder))
            }
        };

        Self::from_parts(config, collection)
    }

    /// Assemble state around an existing collection
    pub fn from_parts(config: VectorizerConfig, collection: Arc<dyn VectorCollection>) -> Result<Self> {
        let pipeline = Arc::new(DocumentPipeline::from_config(&config.chunking)?);
        let coordinator = IngestionCoordinator::new(pipeline, ScopedStore::new(collection))
            .with_staging_dir(config.staging.directory.clone())
            .with_max_upload_bytes(config.server.max_upload_size);

        tracing::info!(
            "Chunking: {} characters, {} overlap",
            config.chunking.chunk_size,
            config.chunking.chunk_overlap
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                coordinator,
                ready: RwLock::new(true),
            }),
        })
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.inner.config
    }

    pub fn coordinator(&self) -> &IngestionCoordinator {
        &self.inner.coordinator
    }

    pub fn store(&self) -> &ScopedStore {
        self.inner.coordinator.store()
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_with_hashing_embeddings() {
        let mut config = VectorizerConfig::default();
        config.embeddings.provider = EmbeddingBackend::Hashing;
        config.embeddings.dimensions = 64;
        config.vector_db.backend = StoreBackend::Memory;

        let state = AppState::new(config).await.unwrap();
        assert_eq!(state.store().backend(), "memory");
        assert!(state.is_ready());

        state.set_ready(false);
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_sqlite_backend_opens_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = VectorizerConfig::default();
        config.embeddings.provider = EmbeddingBackend::Hashing;
        config.vector_db.storage_path = dir.path().join("db");

        let state = AppState::new(config).await.unwrap();
        assert_eq!(state.store().backend(), "sqlite");
        assert!(dir.path().join("db").join("vectors.db").exists());
    }
}
