//! Error types for the vectorizer service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Result type alias for vectorizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Vectorizer errors
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed caller input (mismatched batch lengths, non-positive top_k, empty scope)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The document could not be read or parsed
    #[error("Failed to extract '{source_name}': {message}")]
    Extraction { source_name: String, message: String },

    /// The document parsed but yielded no text
    #[error("No extractable text in '{0}'")]
    EmptyDocument(String),

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The upload stream ended before its terminal frame
    #[error("Incomplete upload: {0}")]
    IncompleteUpload(String),

    /// Vector store collaborator failure, tagged with the collaborator's kind
    #[error("Vector store error ({kind}): {message}")]
    Store { kind: String, message: String },

    /// A chunk was routed to a scope it does not belong to
    #[error("Scope mismatch: {0}")]
    ScopeMismatch(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an extraction error
    pub fn extraction(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable kind reported to callers
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::Extraction { .. } => "extraction_error",
            Error::EmptyDocument(_) => "empty_document",
            Error::UnsupportedFileType(_) => "unsupported_type",
            Error::IncompleteUpload(_) => "incomplete_upload",
            Error::Store { .. } => "store_error",
            Error::ScopeMismatch(_) => "scope_mismatch",
            Error::Embedding(_) => "embedding_error",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::IncompleteUpload(_)
            | Error::ScopeMismatch(_)
            | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Extraction { .. } | Error::EmptyDocument(_) | Error::UnsupportedFileType(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::Store { .. } | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Embedding(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Operation stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Processing,
    Insertion,
    Query,
    Deletion,
    Count,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Processing => "processing",
            Stage::Insertion => "insertion",
            Stage::Query => "query",
            Stage::Deletion => "deletion",
            Stage::Count => "count",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure surfaced to callers together with the stage it happened in
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: Error,
}

impl StageError {
    pub fn new(stage: Stage, error: Error) -> Self {
        Self { stage, error }
    }
}

impl IntoResponse for StageError {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let body = Json(json!({
            "success": false,
            "stage": self.stage,
            "error_type": self.error.kind(),
            "message": self.error.to_string(),
        }));

        (status, body).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
