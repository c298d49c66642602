//! API routes for the vectorizer

pub mod ingest;
pub mod query;
pub mod vectors;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit},
    routing::{delete, get, post},
    Json, Router,
};
use crate::error::{Error, Stage, StageError};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion, with a larger body limit for file uploads
        .route(
            "/vectors/upload",
            post(ingest::upload_pdf).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/vectors/query", post(query::query_vectors))
        .route("/vectors/count", post(vectors::count_vectors))
        .route("/vectors", delete(vectors::delete_vectors))
        .route("/info", get(info))
}

/// Unwrap a JSON body, reporting malformed input as a validation failure of `stage`
pub(crate) fn json_payload<T>(
    stage: Stage,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, StageError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| StageError::new(stage, Error::validation(rejection.body_text())))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "vectorizer",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "PDF vectorization with tenant-scoped retrieval",
        "endpoints": {
            "POST /api/vectors/upload": "Upload a document (multipart: user_id, chat_id, file_id, filename?, file)",
            "POST /api/vectors/query": "Nearest chunks in a scope across one or more query texts",
            "POST /api/vectors/count": "Number of chunks in a scope",
            "DELETE /api/vectors": "Delete every chunk in a scope"
        },
        "scope": ["user_id", "chat_id", "file_id"]
    }))
}
