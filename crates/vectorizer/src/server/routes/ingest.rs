//! Document upload endpoint

use axum::{
    extract::{multipart::Field, Multipart, State},
    Json,
};
use bytes::Bytes;
use futures::{stream, StreamExt};

use crate::error::{Error, Stage, StageError};
use crate::ingestion::{UploadFrame, UploadHeader};
use crate::server::state::AppState;
use crate::types::{response::VectorizeResponse, ScopeRequest};

type StageResult<T> = std::result::Result<T, StageError>;

/// POST /api/vectors/upload - Vectorize one document
///
/// Scope fields (`user_id`, `chat_id`, `file_id`, optional `filename`) must
/// precede the `file` part, which is streamed into the coordinator as it
/// arrives.
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> StageResult<Json<VectorizeResponse>> {
    let mut user_id = None;
    let mut chat_id = None;
    let mut file_id = None;
    let mut filename = None;

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| rejected(format!("Failed to read multipart field: {}", e)))?;
        let Some(field) = field else {
            return Err(rejected("multipart body has no 'file' part"));
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "user_id" => user_id = Some(text(field).await?),
            "chat_id" => chat_id = Some(text(field).await?),
            "file_id" => file_id = Some(text(field).await?),
            "filename" => filename = Some(text(field).await?),
            "file" => {
                let scope = ScopeRequest {
                    user_id: user_id.take().unwrap_or_default(),
                    chat_id: chat_id.take().unwrap_or_default(),
                    file_id: file_id.take().unwrap_or_default(),
                }
                .scope()
                .map_err(|e| StageError::new(Stage::Processing, e))?;

                let filename = filename
                    .take()
                    .or_else(|| field.file_name().map(str::to_string))
                    .unwrap_or_default();

                tracing::info!(scope = %scope, filename = %filename, "Upload started");

                let header = UploadHeader { scope, filename };
                let outcome = state.coordinator().ingest_stream(frames(header, field)).await?;

                return Ok(Json(VectorizeResponse {
                    success: true,
                    message: format!(
                        "Vectorized '{}' into {} chunks",
                        outcome.source_name, outcome.chunk_count
                    ),
                    chunk_count: outcome.chunk_count,
                }));
            }
            other => {
                tracing::debug!("Ignoring multipart field '{}'", other);
            }
        }
    }
}

/// Header frame, one frame per body chunk, then the terminal frame
fn frames<'a>(
    header: UploadHeader,
    field: Field<'a>,
) -> impl futures::Stream<Item = crate::error::Result<UploadFrame>> + Send + 'a {
    let first = stream::once(async move { Ok(UploadFrame::first(header, Bytes::new())) });

    let body = stream::unfold(Some(field), |field| async move {
        let mut field = field?;
        match field.chunk().await {
            Ok(Some(data)) => Some((Ok(UploadFrame::data(data)), Some(field))),
            Ok(None) => Some((Ok(UploadFrame::data(Bytes::new()).last()), None)),
            Err(e) => Some((
                Err(Error::IncompleteUpload(format!("upload body: {}", e))),
                None,
            )),
        }
    });

    first.chain(body)
}

async fn text(field: Field<'_>) -> StageResult<String> {
    let name = field.name().unwrap_or("").to_string();
    field
        .text()
        .await
        .map(|value| value.trim().to_string())
        .map_err(|e| rejected(format!("Failed to read field '{}': {}", name, e)))
}

fn rejected(message: impl Into<String>) -> StageError {
    StageError::new(Stage::Processing, Error::validation(message))
}
