//! Scope, chunk records and stored chunk metadata

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// The `(user, chat, file)` triple isolating one document's chunks from all others
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Scope {
    user_id: String,
    chat_id: String,
    file_id: String,
}

impl Scope {
    /// Build a scope; every component must be non-empty
    pub fn new(
        user_id: impl Into<String>,
        chat_id: impl Into<String>,
        file_id: impl Into<String>,
    ) -> Result<Self> {
        let scope = Self {
            user_id: user_id.into(),
            chat_id: chat_id.into(),
            file_id: file_id.into(),
        };

        for (field, value) in [
            ("user_id", &scope.user_id),
            ("chat_id", &scope.chat_id),
            ("file_id", &scope.file_id),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("{} must not be empty", field)));
            }
        }

        Ok(scope)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.chat_id, self.file_id)
    }
}

/// One split of a document, in reading order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub text: String,
    /// 1-indexed page the text came from
    pub page: u32,
    /// Position of the record within the document
    pub position: usize,
}

/// A chunk with its identity assigned. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub content_hash: String,
    pub scoped_id: String,
    pub scope: Scope,
    pub source_name: String,
    pub page: u32,
}

impl Chunk {
    /// Metadata persisted alongside the chunk text
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            user_id: self.scope.user_id.clone(),
            chat_id: self.scope.chat_id.clone(),
            chunk_hash: self.content_hash.clone(),
            file_id: self.scope.file_id.clone(),
            source: self.source_name.clone(),
            page: self.page,
        }
    }
}

/// Metadata stored with every record in the vector collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub user_id: String,
    pub chat_id: String,
    pub chunk_hash: String,
    pub file_id: String,
    pub source: String,
    pub page: u32,
}

impl ChunkMetadata {
    /// Whether the record belongs to `scope`
    pub fn in_scope(&self, scope: &Scope) -> bool {
        self.user_id == scope.user_id && self.chat_id == scope.chat_id && self.file_id == scope.file_id
    }
}
