//! vectorizer: PDF vectorization with deterministic chunk identity and tenant-scoped retrieval
//!
//! Documents arrive as a stream of upload frames, are split page by page into
//! overlapping chunks, keyed by a content hash bound to their
//! `(user_id, chat_id, file_id)` scope, and upserted into a vector collection.
//! Queries, counts and deletions are always restricted to one scope.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::VectorizerConfig;
pub use error::{Error, Result, Stage, StageError};
pub use ingestion::{DocumentPipeline, IngestOutcome, IngestionCoordinator, UploadFrame, UploadHeader};
pub use retrieval::{QueryMerger, ScopedStore};
pub use server::VectorizerServer;
pub use types::{Chunk, QueryRequest, QueryResult, Scope};
