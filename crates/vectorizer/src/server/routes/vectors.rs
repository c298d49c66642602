//! Count and delete endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::json_payload;
use crate::error::{Stage, StageError};
use crate::server::state::AppState;
use crate::types::{CountResponse, DeleteResponse, ScopeRequest};

/// POST /api/vectors/count - Number of chunks in a scope
pub async fn count_vectors(
    State(state): State<AppState>,
    payload: Result<Json<ScopeRequest>, JsonRejection>,
) -> Result<Json<CountResponse>, StageError> {
    let request = json_payload(Stage::Count, payload)?;
    let fail = |e| StageError::new(Stage::Count, e);

    let scope = request.scope().map_err(fail)?;
    let count = state.store().count(&scope).await.map_err(fail)?;

    Ok(Json(CountResponse {
        success: true,
        message: format!("{} chunks in {}", count, scope),
        count,
    }))
}

/// DELETE /api/vectors - Remove every chunk in a scope
pub async fn delete_vectors(
    State(state): State<AppState>,
    payload: Result<Json<ScopeRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>, StageError> {
    let request = json_payload(Stage::Deletion, payload)?;
    let fail = |e| StageError::new(Stage::Deletion, e);

    let scope = request.scope().map_err(fail)?;
    let removed = state.store().delete(&scope).await.map_err(fail)?;

    tracing::info!(scope = %scope, removed, "Deleted scope");

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Deleted {} chunks from {}", removed, scope),
    }))
}
