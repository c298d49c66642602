//! Vector collection trait: the capability-based store behind `ScopedStore`

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

use crate::types::{ChunkMetadata, Scope};

/// Errors reported by a collection backend
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The batch itself is malformed
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// Query or document embedding failed
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Backend storage failure
    #[error("{backend}: {message}")]
    Backend { backend: String, message: String },

    /// Background task failed to complete
    #[error("task failed: {0}")]
    Task(String),
}

impl CollectionError {
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Kind reported to callers once normalized
    pub fn kind(&self) -> &str {
        match self {
            CollectionError::InvalidBatch(_) => "invalid_batch",
            CollectionError::Embedding(_) => "embedding",
            CollectionError::Backend { backend, .. } => backend,
            CollectionError::Task(_) => "task",
        }
    }
}

pub type CollectionResult<T> = std::result::Result<T, CollectionError>;

/// Metadata fields a filter can match on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    UserId,
    ChatId,
    FileId,
    ChunkHash,
    Source,
}

impl MetadataField {
    pub fn column(&self) -> &'static str {
        match self {
            MetadataField::UserId => "user_id",
            MetadataField::ChatId => "chat_id",
            MetadataField::FileId => "file_id",
            MetadataField::ChunkHash => "chunk_hash",
            MetadataField::Source => "source",
        }
    }

    fn value<'a>(&self, metadata: &'a ChunkMetadata) -> &'a str {
        match self {
            MetadataField::UserId => &metadata.user_id,
            MetadataField::ChatId => &metadata.chat_id,
            MetadataField::FileId => &metadata.file_id,
            MetadataField::ChunkHash => &metadata.chunk_hash,
            MetadataField::Source => &metadata.source,
        }
    }
}

/// Conjunction of exact-match conditions on record metadata.
/// An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    conditions: Vec<(MetadataField, String)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exact-match condition
    pub fn eq(mut self, field: MetadataField, value: impl Into<String>) -> Self {
        self.conditions.push((field, value.into()));
        self
    }

    pub fn conditions(&self) -> &[(MetadataField, String)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| field.value(metadata) == value)
    }
}

impl From<&Scope> for MetadataFilter {
    fn from(scope: &Scope) -> Self {
        MetadataFilter::new()
            .eq(MetadataField::UserId, scope.user_id())
            .eq(MetadataField::ChatId, scope.chat_id())
            .eq(MetadataField::FileId, scope.file_id())
    }
}

/// Parallel ids, documents and metadatas for one upsert call
#[derive(Debug, Clone)]
pub struct UpsertBatch {
    ids: Vec<String>,
    documents: Vec<String>,
    metadatas: Vec<ChunkMetadata>,
}

impl UpsertBatch {
    /// Validate and build a batch: equal lengths, non-empty and unique ids
    pub fn new(
        ids: Vec<String>,
        documents: Vec<String>,
        metadatas: Vec<ChunkMetadata>,
    ) -> CollectionResult<Self> {
        if ids.len() != documents.len() || ids.len() != metadatas.len() {
            return Err(CollectionError::InvalidBatch(format!(
                "mismatched lengths: {} ids, {} documents, {} metadatas",
                ids.len(),
                documents.len(),
                metadatas.len()
            )));
        }

        let mut seen = HashSet::with_capacity(ids.len());
        for id in &ids {
            if id.is_empty() {
                return Err(CollectionError::InvalidBatch("empty id".to_string()));
            }
            if !seen.insert(id.as_str()) {
                return Err(CollectionError::InvalidBatch(format!("duplicate id '{}'", id)));
            }
        }

        Ok(Self {
            ids,
            documents,
            metadatas,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Iterate `(id, document, metadata)` rows
    pub fn rows(&self) -> impl Iterator<Item = (&String, &String, &ChunkMetadata)> {
        self.ids
            .iter()
            .zip(self.documents.iter())
            .zip(self.metadatas.iter())
            .map(|((id, doc), meta)| (id, doc, meta))
    }
}

/// One record matched by a query
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionHit {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance, lower is more similar
    pub distance: f32,
}

/// Trait for a logical collection of embedded documents
///
/// Implementations:
/// - `MemoryCollection`: in-process, lost on restart
/// - `SqliteCollection`: persistent SQLite table
#[async_trait]
pub trait VectorCollection: Send + Sync {
    /// Insert or replace records by id; returns the number written
    async fn upsert(&self, batch: &UpsertBatch) -> CollectionResult<usize>;

    /// Nearest records for each query text, at most `n_results` each,
    /// restricted to records matching `filter`
    async fn query(
        &self,
        query_texts: &[String],
        filter: &MetadataFilter,
        n_results: usize,
    ) -> CollectionResult<Vec<Vec<CollectionHit>>>;

    /// Delete matching records; returns how many were removed
    async fn delete(&self, filter: &MetadataFilter) -> CollectionResult<usize>;

    /// Ids of matching records
    async fn get(&self, filter: &MetadataFilter) -> CollectionResult<Vec<String>>;

    /// Total number of records
    async fn len(&self) -> CollectionResult<usize>;

    /// Check if the collection is empty
    async fn is_empty(&self) -> CollectionResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the backend is healthy
    async fn health_check(&self) -> CollectionResult<bool>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// `1 - cosine similarity`; a zero vector is maximally dissimilar
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Keep the `n` lowest-distance hits, ties broken by id
pub(crate) fn nearest(mut hits: Vec<CollectionHit>, n: usize) -> Vec<CollectionHit> {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
    hits.truncate(n);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(user: &str, chat: &str, file: &str) -> ChunkMetadata {
        ChunkMetadata {
            user_id: user.into(),
            chat_id: chat.into(),
            chunk_hash: "h".into(),
            file_id: file.into(),
            source: "doc.pdf".into(),
            page: 1,
        }
    }

    #[test]
    fn test_batch_rejects_mismatched_lengths() {
        let err = UpsertBatch::new(
            vec!["a".into(), "b".into()],
            vec!["doc".into()],
            vec![meta("u", "c", "f")],
        )
        .unwrap_err();
        assert!(matches!(err, CollectionError::InvalidBatch(_)));
    }

    #[test]
    fn test_batch_rejects_duplicates_and_empty_ids() {
        let dup = UpsertBatch::new(
            vec!["a".into(), "a".into()],
            vec!["x".into(), "y".into()],
            vec![meta("u", "c", "f"), meta("u", "c", "f")],
        );
        assert!(dup.is_err());

        let empty = UpsertBatch::new(vec!["".into()], vec!["x".into()], vec![meta("u", "c", "f")]);
        assert!(empty.is_err());
    }

    #[test]
    fn test_scope_filter_matches_all_three() {
        let scope = Scope::new("u1", "c1", "f1").unwrap();
        let filter = MetadataFilter::from(&scope);

        assert_eq!(filter.conditions().len(), 3);
        assert!(filter.matches(&meta("u1", "c1", "f1")));
        assert!(!filter.matches(&meta("u1", "c1", "f2")));
        assert!(!filter.matches(&meta("u2", "c1", "f1")));
        assert!(MetadataFilter::new().matches(&meta("u2", "c9", "f9")));
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
