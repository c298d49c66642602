//! Deterministic chunk addressing
//!
//! A chunk's storage key is derived from its scope and a SHA-256 digest of its
//! text, so re-uploading identical content into the same scope overwrites the
//! existing records instead of duplicating them.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::types::{Chunk, ChunkRecord, Scope};

/// Hex-encoded SHA-256 of the chunk text
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Storage key for a chunk in `scope`.
///
/// Each component is length-prefixed so that no two distinct scopes can
/// produce the same key, whatever characters the ids contain.
pub fn scoped_id(scope: &Scope, content_hash: &str) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}:{}",
        scope.user_id().len(),
        scope.user_id(),
        scope.chat_id().len(),
        scope.chat_id(),
        scope.file_id().len(),
        scope.file_id(),
        content_hash
    )
}

/// Assign identities to a document's records.
///
/// Records whose text repeats earlier in the same document map to the same
/// key; only the first occurrence is kept.
pub fn identify(scope: &Scope, source_name: &str, records: Vec<ChunkRecord>) -> Vec<Chunk> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut chunks = Vec::with_capacity(records.len());

    for record in records {
        let hash = content_hash(&record.text);
        let id = scoped_id(scope, &hash);
        if !seen.insert(id.clone()) {
            tracing::debug!(position = record.position, "Skipping repeated chunk");
            continue;
        }

        chunks.push(Chunk {
            content: record.text,
            content_hash: hash,
            scoped_id: id,
            scope: scope.clone(),
            source_name: source_name.to_string(),
            page: record.page,
        });
    }

    chunks
}
