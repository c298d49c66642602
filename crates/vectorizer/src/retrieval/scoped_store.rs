//! Tenant-scoped access to the vector collection
//!
//! Every operation is restricted to one `(user, chat, file)` scope. The scope
//! filter is built here from the [`Scope`] itself, so no call can reach the
//! collection without it.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ingestion::identity;
use crate::providers::vector_store::{CollectionError, MetadataFilter, UpsertBatch, VectorCollection};
use crate::types::{Chunk, QueryResult, Scope};

use super::merger::QueryMerger;

/// Scoped wrapper around a [`VectorCollection`]
#[derive(Clone)]
pub struct ScopedStore {
    collection: Arc<dyn VectorCollection>,
}

impl ScopedStore {
    pub fn new(collection: Arc<dyn VectorCollection>) -> Self {
        Self { collection }
    }

    /// Backend name for logging
    pub fn backend(&self) -> &str {
        self.collection.name()
    }

    /// Insert or replace `chunks` in `scope`; returns the number written.
    ///
    /// Every chunk must belong to `scope` and carry the id derived from it.
    pub async fn upsert(&self, scope: &Scope, chunks: &[Chunk]) -> Result<usize> {
        for chunk in chunks {
            if chunk.scope != *scope {
                return Err(Error::ScopeMismatch(format!(
                    "chunk {} belongs to {}, not {}",
                    chunk.scoped_id, chunk.scope, scope
                )));
            }
            if chunk.scoped_id != identity::scoped_id(scope, &chunk.content_hash) {
                return Err(Error::ScopeMismatch(format!(
                    "chunk id {} was not derived from {}",
                    chunk.scoped_id, scope
                )));
            }
        }

        if chunks.is_empty() {
            return Ok(0);
        }

        let batch = UpsertBatch::new(
            chunks.iter().map(|c| c.scoped_id.clone()).collect(),
            chunks.iter().map(|c| c.content.clone()).collect(),
            chunks.iter().map(Chunk::metadata).collect(),
        )
        .map_err(normalize)?;

        self.collection.upsert(&batch).await.map_err(normalize)
    }

    /// Nearest chunks in `scope` across all `query_texts`, merged and ranked.
    ///
    /// `top_k` must be positive. Each text asks the collection for `top_k`
    /// candidates so the merged list can always be filled.
    pub async fn query(
        &self,
        scope: &Scope,
        query_texts: &[String],
        top_k: i64,
    ) -> Result<Vec<QueryResult>> {
        if top_k <= 0 {
            return Err(Error::validation(format!(
                "top_k must be a positive integer, got {}",
                top_k
            )));
        }
        if query_texts.is_empty() {
            return Ok(Vec::new());
        }

        let top_k = usize::try_from(top_k)
            .map_err(|_| Error::validation(format!("top_k {} is too large", top_k)))?;
        let raw = self
            .collection
            .query(query_texts, &MetadataFilter::from(scope), top_k)
            .await
            .map_err(normalize)?;

        let result_sets = raw
            .into_iter()
            .map(|hits| {
                hits.into_iter()
                    .filter(|hit| {
                        let in_scope = hit.metadata.in_scope(scope);
                        if !in_scope {
                            tracing::warn!(id = %hit.id, "Collection returned a record outside the query scope");
                        }
                        in_scope
                    })
                    .map(|hit| QueryResult {
                        scoped_id: hit.id,
                        content: hit.document,
                        source_name: hit.metadata.source,
                        page: hit.metadata.page,
                        distance: hit.distance,
                    })
                    .collect()
            })
            .collect();

        Ok(QueryMerger::merge(result_sets, top_k))
    }

    /// Delete every chunk in `scope`; deleting an empty scope is a no-op
    pub async fn delete(&self, scope: &Scope) -> Result<usize> {
        self.collection
            .delete(&MetadataFilter::from(scope))
            .await
            .map_err(normalize)
    }

    /// Number of chunks in `scope`
    pub async fn count(&self, scope: &Scope) -> Result<usize> {
        let ids = self
            .collection
            .get(&MetadataFilter::from(scope))
            .await
            .map_err(normalize)?;
        Ok(ids.len())
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.collection.health_check().await.map_err(normalize)
    }
}

/// Map collection failures onto the service error taxonomy
fn normalize(error: CollectionError) -> Error {
    match error {
        CollectionError::InvalidBatch(message) => Error::Validation(message),
        CollectionError::Embedding(message) => Error::Embedding(message),
        other => Error::store(other.kind(), other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::identity::identify;
    use crate::providers::hashing::HashingEmbedder;
    use crate::providers::memory::MemoryCollection;
    use crate::providers::vector_store::{CollectionHit, CollectionResult};
    use crate::types::ChunkRecord;
    use async_trait::async_trait;

    fn store() -> ScopedStore {
        ScopedStore::new(Arc::new(MemoryCollection::new(
            "test",
            Arc::new(HashingEmbedder::new(256)),
        )))
    }

    fn chunks(scope: &Scope, texts: &[&str]) -> Vec<Chunk> {
        let records = texts
            .iter()
            .enumerate()
            .map(|(i, t)| ChunkRecord {
                text: t.to_string(),
                page: 1,
                position: i,
            })
            .collect();
        identify(scope, "doc.pdf", records)
    }

    struct FailingCollection;

    #[async_trait]
    impl VectorCollection for FailingCollection {
        async fn upsert(&self, _batch: &UpsertBatch) -> CollectionResult<usize> {
            Err(CollectionError::backend("sqlite", "database is locked"))
        }
        async fn query(
            &self,
            _query_texts: &[String],
            _filter: &MetadataFilter,
            _n_results: usize,
        ) -> CollectionResult<Vec<Vec<CollectionHit>>> {
            Err(CollectionError::Embedding("model not loaded".into()))
        }
        async fn delete(&self, _filter: &MetadataFilter) -> CollectionResult<usize> {
            Err(CollectionError::Task("cancelled".into()))
        }
        async fn get(&self, _filter: &MetadataFilter) -> CollectionResult<Vec<String>> {
            Err(CollectionError::backend("sqlite", "disk I/O error"))
        }
        async fn len(&self) -> CollectionResult<usize> {
            Ok(0)
        }
        async fn health_check(&self) -> CollectionResult<bool> {
            Ok(false)
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_upsert_rejects_foreign_chunks() {
        let store = store();
        let s1 = Scope::new("u1", "c1", "f1").unwrap();
        let s2 = Scope::new("u1", "c1", "f2").unwrap();

        let err = store.upsert(&s1, &chunks(&s2, &["hello"])).await.unwrap_err();
        assert_eq!(err.kind(), "scope_mismatch");

        let mut forged = chunks(&s1, &["hello"]);
        forged[0].scoped_id = "forged".into();
        let err = store.upsert(&s1, &forged).await.unwrap_err();
        assert_eq!(err.kind(), "scope_mismatch");

        assert_eq!(store.count(&s1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_validates_top_k() {
        let store = store();
        let scope = Scope::new("u1", "c1", "f1").unwrap();
        let texts = vec!["anything".to_string()];

        for top_k in [0, -1] {
            let err = store.query(&scope, &texts, top_k).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert!(store.query(&scope, &[], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_fills_top_k_beyond_three() {
        let store = store();
        let scope = Scope::new("u1", "c1", "f1").unwrap();
        let texts = ["one fish", "two fish", "red fish", "blue fish", "old fish"];
        store.upsert(&scope, &chunks(&scope, &texts)).await.unwrap();

        let results = store
            .query(&scope, &["fish".to_string()], 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 5);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let store = store();
        let scope = Scope::new("u1", "c1", "f1").unwrap();
        store
            .upsert(&scope, &chunks(&scope, &["alpha", "beta"]))
            .await
            .unwrap();

        assert_eq!(store.count(&scope).await.unwrap(), 2);
        assert_eq!(store.delete(&scope).await.unwrap(), 2);
        assert_eq!(store.count(&scope).await.unwrap(), 0);
        assert_eq!(store.delete(&scope).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_collection_failures_are_normalized() {
        let store = ScopedStore::new(Arc::new(FailingCollection));
        let scope = Scope::new("u1", "c1", "f1").unwrap();

        match store.upsert(&scope, &chunks(&scope, &["x"])).await.unwrap_err() {
            Error::Store { kind, message } => {
                assert_eq!(kind, "sqlite");
                assert!(message.contains("database is locked"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = store.query(&scope, &["x".to_string()], 1).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(ref message) if message.contains("model not loaded")));
        assert_eq!(err.kind(), "embedding_error");

        let err = store.delete(&scope).await.unwrap_err();
        assert!(matches!(err, Error::Store { ref kind, .. } if kind == "task"));

        assert_eq!(store.count(&scope).await.unwrap_err().kind(), "store_error");
    }
}
