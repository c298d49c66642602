//! Provider abstractions for embeddings and vector collections
//!
//! Trait-based seams that let the service switch between Ollama and offline
//! embeddings, and between in-memory and SQLite-backed collections.

pub mod embedding;
pub mod hashing;
pub mod memory;
pub mod ollama;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use hashing::HashingEmbedder;
pub use memory::MemoryCollection;
pub use ollama::OllamaEmbedder;
pub use vector_store::{
    CollectionError, CollectionHit, CollectionResult, MetadataField, MetadataFilter, UpsertBatch,
    VectorCollection,
};
