//! Configuration for the vectorizer service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main vectorizer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Ollama configuration
    pub ollama: OllamaConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// Upload staging configuration
    pub staging: StagingConfig,
}

impl VectorizerConfig {
    /// Load configuration: defaults, then an optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = lookup("VECTOR_DB_PATH") {
            self.vector_db.storage_path = PathBuf::from(path);
        }
        if let Some(name) = lookup("COLLECTION_NAME") {
            self.vector_db.collection = name;
        }
        if let Some(host) = lookup("VECTORIZER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("VECTORIZER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid VECTORIZER_PORT '{}'", port)))?;
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.ollama.base_url = url;
        }
        if let Some(provider) = lookup("VECTORIZER_EMBEDDINGS") {
            self.embeddings.provider = match provider.to_ascii_lowercase().as_str() {
                "ollama" => EmbeddingBackend::Ollama,
                "hashing" => EmbeddingBackend::Hashing,
                other => {
                    return Err(Error::Config(format!(
                        "unknown embedding provider '{}'",
                        other
                    )))
                }
            };
        }
        Ok(())
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.vector_db.collection.trim().is_empty() {
            return Err(Error::Config("collection name must not be empty".into()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embedding dimensions must be positive".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50051,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Embedding provider selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama HTTP embeddings
    #[default]
    Ollama,
    /// Offline feature-hashing embeddings
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            dimensions: 768,
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Vector store backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Persistent SQLite collection
    #[default]
    Sqlite,
    /// In-process collection, lost on restart
    Memory,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    pub backend: StoreBackend,
    /// Directory holding the collection database
    pub storage_path: PathBuf,
    /// Logical collection name
    pub collection: String,
}

impl VectorDbConfig {
    /// Database file for the configured collection
    pub fn database_file(&self) -> PathBuf {
        self.storage_path.join("vectors.db")
    }
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        let storage_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vectorizer");

        Self {
            backend: StoreBackend::Sqlite,
            storage_path,
            collection: "pdf_chunks".to_string(),
        }
    }
}

/// Upload staging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Parent directory for per-upload staging dirs (system temp dir when unset)
    pub directory: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = VectorizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.server.port, 50051);
    }

    #[test]
    fn test_partial_toml() {
        let config = VectorizerConfig::from_toml(
            r#"
            [chunking]
            chunk_size = 500

            [vector_db]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.vector_db.backend, StoreBackend::Memory);
        assert_eq!(config.vector_db.collection, "pdf_chunks");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("VECTOR_DB_PATH", "/tmp/vdb"),
            ("COLLECTION_NAME", "docs"),
            ("VECTORIZER_PORT", "9000"),
            ("VECTORIZER_EMBEDDINGS", "hashing"),
        ]
        .into_iter()
        .collect();

        let mut config = VectorizerConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.vector_db.storage_path, PathBuf::from("/tmp/vdb"));
        assert_eq!(config.vector_db.collection, "docs");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.embeddings.provider, EmbeddingBackend::Hashing);
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut config = VectorizerConfig::default();
        let result = config.apply_env(|key| (key == "VECTORIZER_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overlap_must_be_smaller() {
        let mut config = VectorizerConfig::default();
        config.chunking.chunk_overlap = 1000;
        assert!(config.validate().is_err());

        config.chunking.chunk_size = 0;
        config.chunking.chunk_overlap = 0;
        assert!(config.validate().is_err());
    }
}
