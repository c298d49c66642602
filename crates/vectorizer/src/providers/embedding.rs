//! Embedding provider trait used by the vector collections

use async_trait::async_trait;
use crate::error::{Error, Result};

/// Turns chunk and query text into vectors.
///
/// Implementations:
/// - `OllamaEmbedder`: local Ollama server (nomic-embed-text)
/// - `HashingEmbedder`: offline feature hashing, for development and tests
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch, one vector per input in input order.
    ///
    /// The default calls `embed` for each text and fails on the first error.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            let embedding = self.embed(text).await?;
            if embedding.len() != self.dimensions() {
                return Err(Error::embedding(format!(
                    "{} returned {} dimensions, expected {}",
                    self.name(),
                    embedding.len(),
                    self.dimensions()
                )));
            }
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }

    /// Vector length produced by this provider
    fn dimensions(&self) -> usize;

    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
