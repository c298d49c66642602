//! Scoped query endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::time::Instant;

use super::json_payload;
use crate::error::{Stage, StageError};
use crate::server::state::AppState;
use crate::types::{QueryHit, QueryRequest, QueryResponse};

/// POST /api/vectors/query - Nearest chunks in a scope
pub async fn query_vectors(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, StageError> {
    let start = Instant::now();
    let request = json_payload(Stage::Query, payload)?;
    let fail = |e| StageError::new(Stage::Query, e);

    let scope = request.scope.scope().map_err(fail)?;
    let results = state
        .store()
        .query(&scope, &request.query_texts, request.top_k)
        .await
        .map_err(fail)?;

    tracing::info!(
        scope = %scope,
        texts = request.query_texts.len(),
        top_k = request.top_k,
        hits = results.len(),
        "Query completed in {}ms",
        start.elapsed().as_millis()
    );

    Ok(Json(QueryResponse {
        success: true,
        message: format!("Found {} results", results.len()),
        results: results.into_iter().map(QueryHit::from).collect(),
    }))
}
