//! Per-upload ingestion state machine
//!
//! `Receiving -> Extracting -> Chunking -> Identifying -> Persisting`, ending
//! in `Committed` or `Failed`. Nothing reaches the store before `Persisting`,
//! and the staging directory is removed on every exit path.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{Error, Result, Stage, StageError};
use crate::retrieval::ScopedStore;
use crate::types::Scope;

use super::identity;
use super::processor::DocumentPipeline;
use super::upload::{UploadAccumulator, UploadFrame, UploadHeader};

/// Ingestion states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Receiving,
    Extracting,
    Chunking,
    Identifying,
    Persisting,
    Committed,
    Failed,
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestState::Receiving => "receiving",
            IngestState::Extracting => "extracting",
            IngestState::Chunking => "chunking",
            IngestState::Identifying => "identifying",
            IngestState::Persisting => "persisting",
            IngestState::Committed => "committed",
            IngestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl IngestState {
    /// Stage a failure in this state is reported under
    fn stage(&self) -> Stage {
        match self {
            IngestState::Persisting => Stage::Insertion,
            _ => Stage::Processing,
        }
    }
}

/// Result of a committed ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub scope: Scope,
    pub chunk_count: usize,
    pub source_name: String,
}

/// Drives uploads through extraction, identity assignment and persistence
pub struct IngestionCoordinator {
    pipeline: Arc<DocumentPipeline>,
    store: ScopedStore,
    staging_dir: Option<PathBuf>,
    max_upload_bytes: Option<usize>,
}

impl IngestionCoordinator {
    pub fn new(pipeline: Arc<DocumentPipeline>, store: ScopedStore) -> Self {
        Self {
            pipeline,
            store,
            staging_dir: None,
            max_upload_bytes: None,
        }
    }

    /// Stage uploads under `dir` instead of the system temp dir
    pub fn with_staging_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.staging_dir = dir;
        self
    }

    /// Reject uploads larger than `bytes`
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = Some(bytes);
        self
    }

    pub fn store(&self) -> &ScopedStore {
        &self.store
    }

    /// Ingest a complete document held in memory
    pub async fn ingest_document(
        &self,
        scope: Scope,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> std::result::Result<IngestOutcome, StageError> {
        let header = UploadHeader {
            scope,
            filename: filename.into(),
        };
        let frame = UploadFrame::first(header, data).last();
        self.ingest_stream(futures::stream::iter([Ok(frame)])).await
    }

    /// Ingest a document delivered as a stream of frames.
    ///
    /// The stream must end with a terminal frame; an early end or a stream
    /// error fails with `IncompleteUpload` and nothing is persisted.
    pub async fn ingest_stream<S>(&self, frames: S) -> std::result::Result<IngestOutcome, StageError>
    where
        S: Stream<Item = Result<UploadFrame>> + Send,
    {
        let upload_id = Uuid::new_v4();
        let span = tracing::info_span!("ingest", %upload_id);

        async move {
            let mut accumulator =
                UploadAccumulator::new(self.staging_dir.as_deref(), self.max_upload_bytes)
                    .map_err(|e| StageError::new(Stage::Processing, e))?;

            let mut state = IngestState::Receiving;
            let result = self.run(&mut accumulator, frames, &mut state).await;
            accumulator.cleanup();

            match result {
                Ok(outcome) => {
                    transition(&mut state, IngestState::Committed);
                    tracing::info!(
                        scope = %outcome.scope,
                        source = %outcome.source_name,
                        chunks = outcome.chunk_count,
                        "Ingestion committed"
                    );
                    Ok(outcome)
                }
                Err(e) => {
                    let failed_in = state;
                    transition(&mut state, IngestState::Failed);
                    tracing::warn!(state = %failed_in, kind = e.kind(), "Ingestion failed: {}", e);
                    Err(StageError::new(failed_in.stage(), e))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run<S>(
        &self,
        accumulator: &mut UploadAccumulator,
        frames: S,
        state: &mut IngestState,
    ) -> Result<IngestOutcome>
    where
        S: Stream<Item = Result<UploadFrame>> + Send,
    {
        futures::pin_mut!(frames);

        while let Some(frame) = frames.next().await {
            let frame = frame.map_err(|e| Error::IncompleteUpload(format!("stream error: {}", e)))?;
            accumulator.push(frame).await?;
            if accumulator.is_complete() {
                break;
            }
        }
        let (header, payload) = accumulator.finish().await?;
        let UploadHeader { scope, filename } = header;
        let source_name = if filename.trim().is_empty() {
            scope.file_id().to_string()
        } else {
            filename
        };
        tracing::debug!(scope = %scope, source = %source_name, bytes = payload.len(), "Upload received");

        transition(state, IngestState::Extracting);
        let pipeline = Arc::clone(&self.pipeline);
        let name = source_name.clone();
        let pages = tokio::task::spawn_blocking(move || pipeline.extract(&payload, &name))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        transition(state, IngestState::Chunking);
        let records = self.pipeline.chunk_pages(pages, &source_name)?;

        transition(state, IngestState::Identifying);
        let chunks = identity::identify(&scope, &source_name, records);

        transition(state, IngestState::Persisting);
        let chunk_count = self.store.upsert(&scope, &chunks).await?;

        Ok(IngestOutcome {
            scope,
            chunk_count,
            source_name,
        })
    }
}

fn transition(state: &mut IngestState, next: IngestState) {
    tracing::debug!("{} -> {}", state, next);
    *state = next;
}
