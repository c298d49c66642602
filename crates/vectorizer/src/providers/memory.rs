//! In-process vector collection

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::ChunkMetadata;

use super::embedding::EmbeddingProvider;
use super::vector_store::{
    cosine_distance, nearest, CollectionError, CollectionHit, CollectionResult, MetadataFilter,
    UpsertBatch, VectorCollection,
};

struct Record {
    document: String,
    metadata: ChunkMetadata,
    embedding: Vec<f32>,
}

/// Collection held in memory behind a read-write lock
pub struct MemoryCollection {
    name: String,
    embedder: Arc<dyn EmbeddingProvider>,
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            name: name.into(),
            embedder,
            records: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorCollection for MemoryCollection {
    async fn upsert(&self, batch: &UpsertBatch) -> CollectionResult<usize> {
        // Embed before taking the lock so a failure leaves the collection untouched
        let embeddings = self
            .embedder
            .embed_batch(batch.documents())
            .await
            .map_err(|e| CollectionError::Embedding(e.to_string()))?;

        let mut records = self.records.write();
        for ((id, document, metadata), embedding) in batch.rows().zip(embeddings) {
            records.insert(
                id.clone(),
                Record {
                    document: document.clone(),
                    metadata: metadata.clone(),
                    embedding,
                },
            );
        }
        tracing::debug!(collection = %self.name, rows = batch.len(), total = records.len(), "Upserted batch");

        Ok(batch.len())
    }

    async fn query(
        &self,
        query_texts: &[String],
        filter: &MetadataFilter,
        n_results: usize,
    ) -> CollectionResult<Vec<Vec<CollectionHit>>> {
        let embeddings = self
            .embedder
            .embed_batch(query_texts)
            .await
            .map_err(|e| CollectionError::Embedding(e.to_string()))?;

        let records = self.records.read();
        Ok(embeddings
            .iter()
            .map(|query| {
                let hits = records
                    .iter()
                    .filter(|(_, record)| filter.matches(&record.metadata))
                    .map(|(id, record)| CollectionHit {
                        id: id.clone(),
                        document: record.document.clone(),
                        metadata: record.metadata.clone(),
                        distance: cosine_distance(query, &record.embedding),
                    })
                    .collect();
                nearest(hits, n_results)
            })
            .collect())
    }

    async fn delete(&self, filter: &MetadataFilter) -> CollectionResult<usize> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| !filter.matches(&record.metadata));
        Ok(before - records.len())
    }

    async fn get(&self, filter: &MetadataFilter) -> CollectionResult<Vec<String>> {
        let records = self.records.read();
        let mut ids: Vec<String> = records
            .iter()
            .filter(|(_, record)| filter.matches(&record.metadata))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn len(&self) -> CollectionResult<usize> {
        Ok(self.records.read().len())
    }

    async fn health_check(&self) -> CollectionResult<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
