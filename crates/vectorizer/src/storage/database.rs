//! SQLite-backed vector collection
//!
//! One table per logical collection, keyed by chunk id. Embeddings are stored
//! as little-endian `f32` blobs and queries scan the rows matching the filter.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::Arc;

use crate::providers::embedding::EmbeddingProvider;
use crate::providers::vector_store::{
    cosine_distance, nearest, CollectionError, CollectionHit, CollectionResult, MetadataFilter,
    UpsertBatch, VectorCollection,
};
use crate::types::ChunkMetadata;

const BACKEND: &str = "sqlite";

/// Persistent collection in a SQLite database
pub struct SqliteCollection {
    conn: Arc<Mutex<Connection>>,
    table: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteCollection {
    /// Create or open the collection in the database at `path`
    pub fn open<P: AsRef<Path>>(
        path: P,
        collection: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> CollectionResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CollectionError::backend(BACKEND, format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path).map_err(sqlite_error)?;
        Self::with_connection(conn, collection, embedder)
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory(collection: &str, embedder: Arc<dyn EmbeddingProvider>) -> CollectionResult<Self> {
        let conn = Connection::open_in_memory().map_err(sqlite_error)?;
        Self::with_connection(conn, collection, embedder)
    }

    fn with_connection(
        conn: Connection,
        collection: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> CollectionResult<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table_name(collection),
            embedder,
        };

        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> CollectionResult<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            "#,
        )
        .map_err(sqlite_error)?;

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                user_id TEXT NOT NULL,
                chat_id TEXT NOT NULL,
                file_id TEXT NOT NULL,
                chunk_hash TEXT NOT NULL,
                source TEXT NOT NULL,
                page INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_scope ON {table}(user_id, chat_id, file_id);
            "#,
            table = self.table
        ))
        .map_err(sqlite_error)?;

        tracing::info!("Collection table '{}' ready", self.table);
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> CollectionResult<T>
    where
        F: FnOnce(&mut Connection, &str) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let table = self.table.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn, &table)
        })
        .await
        .map_err(|e| CollectionError::Task(format!("Task join error: {}", e)))?
        .map_err(sqlite_error)
    }
}

#[async_trait]
impl VectorCollection for SqliteCollection {
    async fn upsert(&self, batch: &UpsertBatch) -> CollectionResult<usize> {
        let embeddings = self
            .embedder
            .embed_batch(batch.documents())
            .await
            .map_err(|e| CollectionError::Embedding(e.to_string()))?;

        let rows: Vec<(String, String, ChunkMetadata, Vec<u8>)> = batch
            .rows()
            .zip(embeddings)
            .map(|((id, doc, meta), embedding)| {
                (id.clone(), doc.clone(), meta.clone(), encode_embedding(&embedding))
            })
            .collect();

        self.blocking(move |conn, table| {
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(&format!(
                    r#"
                    INSERT INTO {table}
                        (id, document, user_id, chat_id, file_id, chunk_hash, source, page, embedding, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(id) DO UPDATE SET
                        document = excluded.document,
                        user_id = excluded.user_id,
                        chat_id = excluded.chat_id,
                        file_id = excluded.file_id,
                        chunk_hash = excluded.chunk_hash,
                        source = excluded.source,
                        page = excluded.page,
                        embedding = excluded.embedding,
                        updated_at = excluded.updated_at
                    "#
                ))?;

                for (id, document, meta, embedding) in &rows {
                    stmt.execute(params![
                        id,
                        document,
                        meta.user_id,
                        meta.chat_id,
                        meta.file_id,
                        meta.chunk_hash,
                        meta.source,
                        meta.page as i64,
                        embedding,
                        now,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(rows.len())
        })
        .await
    }

    async fn query(
        &self,
        query_texts: &[String],
        filter: &MetadataFilter,
        n_results: usize,
    ) -> CollectionResult<Vec<Vec<CollectionHit>>> {
        let queries = self
            .embedder
            .embed_batch(query_texts)
            .await
            .map_err(|e| CollectionError::Embedding(e.to_string()))?;

        let (clause, values) = where_clause(filter);
        let records = self
            .blocking(move |conn, table| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, document, user_id, chat_id, file_id, chunk_hash, source, page, embedding \
                     FROM {table}{clause}"
                ))?;

                let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                    let page: i64 = row.get(7)?;
                    let blob: Vec<u8> = row.get(8)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        ChunkMetadata {
                            user_id: row.get(2)?,
                            chat_id: row.get(3)?,
                            file_id: row.get(4)?,
                            chunk_hash: row.get(5)?,
                            source: row.get(6)?,
                            page: page as u32,
                        },
                        decode_embedding(&blob),
                    ))
                })?;

                let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await?;

        Ok(queries
            .iter()
            .map(|query| {
                let hits = records
                    .iter()
                    .map(|(id, document, metadata, embedding)| CollectionHit {
                        id: id.clone(),
                        document: document.clone(),
                        metadata: metadata.clone(),
                        distance: cosine_distance(query, embedding),
                    })
                    .collect();
                nearest(hits, n_results)
            })
            .collect())
    }

    async fn delete(&self, filter: &MetadataFilter) -> CollectionResult<usize> {
        let (clause, values) = where_clause(filter);
        self.blocking(move |conn, table| {
            conn.execute(
                &format!("DELETE FROM {table}{clause}"),
                params_from_iter(values.iter()),
            )
        })
        .await
    }

    async fn get(&self, filter: &MetadataFilter) -> CollectionResult<Vec<String>> {
        let (clause, values) = where_clause(filter);
        self.blocking(move |conn, table| {
            let mut stmt = conn.prepare(&format!("SELECT id FROM {table}{clause} ORDER BY id"))?;
            let ids = stmt
                .query_map(params_from_iter(values.iter()), |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn len(&self) -> CollectionResult<usize> {
        self.blocking(|conn, table| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn health_check(&self) -> CollectionResult<bool> {
        self.blocking(|conn, _| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await
            .map(|one| one == 1)
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

fn sqlite_error(e: rusqlite::Error) -> CollectionError {
    CollectionError::backend(BACKEND, e.to_string())
}

/// Table name for a collection; anything outside `[A-Za-z0-9_]` becomes `_`
fn table_name(collection: &str) -> String {
    let sanitized: String = collection
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("chunks_{}", sanitized)
}

/// `WHERE` clause and bound values for a filter; columns come from a fixed set
fn where_clause(filter: &MetadataFilter) -> (String, Vec<String>) {
    if filter.is_empty() {
        return (String::new(), Vec::new());
    }

    let conditions: Vec<String> = filter
        .conditions()
        .iter()
        .enumerate()
        .map(|(i, (field, _))| format!("{} = ?{}", field.column(), i + 1))
        .collect();
    let values = filter
        .conditions()
        .iter()
        .map(|(_, value)| value.clone())
        .collect();

    (format!(" WHERE {}", conditions.join(" AND ")), values)
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
