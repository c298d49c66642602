//! Core types for the vectorizer

pub mod chunk;
pub mod query;
pub mod response;

pub use chunk::{Chunk, ChunkMetadata, ChunkRecord, Scope};
pub use query::{QueryRequest, QueryResult, ScopeRequest};
pub use response::{CountResponse, DeleteResponse, QueryHit, QueryResponse, VectorizeResponse};
