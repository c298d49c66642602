//! Streaming upload reception
//!
//! Frames are appended to a staged file inside a per-upload temporary
//! directory. The accumulator owns that directory and removes it in
//! [`UploadAccumulator::cleanup`].

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::types::Scope;

/// Identifies the document being uploaded; carried by the first frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHeader {
    pub scope: Scope,
    pub filename: String,
}

/// One piece of an upload stream
#[derive(Debug, Clone)]
pub struct UploadFrame {
    /// Present on the first frame only
    pub header: Option<UploadHeader>,
    pub data: Bytes,
    /// Terminal marker
    pub is_last: bool,
}

impl UploadFrame {
    pub fn first(header: UploadHeader, data: impl Into<Bytes>) -> Self {
        Self {
            header: Some(header),
            data: data.into(),
            is_last: false,
        }
    }

    pub fn data(data: impl Into<Bytes>) -> Self {
        Self {
            header: None,
            data: data.into(),
            is_last: false,
        }
    }

    pub fn last(mut self) -> Self {
        self.is_last = true;
        self
    }
}

/// Receiving state of an ingestion: collects frames until the terminal marker
pub struct UploadAccumulator {
    staging: TempDir,
    header: Option<UploadHeader>,
    staged: Option<(PathBuf, File)>,
    received: usize,
    max_bytes: Option<usize>,
    complete: bool,
}

impl UploadAccumulator {
    /// Create the staging directory under `parent` (system temp dir when `None`)
    pub fn new(parent: Option<&Path>, max_bytes: Option<usize>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-");
        let staging = match parent {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)?
            }
            None => builder.tempdir()?,
        };

        Ok(Self {
            staging,
            header: None,
            staged: None,
            received: 0,
            max_bytes,
            complete: false,
        })
    }

    /// Staging directory owned by this upload
    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Append a frame
    pub async fn push(&mut self, frame: UploadFrame) -> Result<()> {
        if self.complete {
            return Err(Error::validation("frame received after the terminal frame"));
        }

        match (frame.header, self.header.is_some()) {
            (Some(header), false) => {
                let path = self.staging.path().join(staged_file_name(&header.filename));
                let file = File::create(&path).await?;
                self.staged = Some((path, file));
                self.header = Some(header);
            }
            (Some(_), true) => {
                return Err(Error::validation("upload header repeated after the first frame"));
            }
            (None, false) => {
                return Err(Error::validation("the first frame must carry the upload header"));
            }
            (None, true) => {}
        }

        self.received += frame.data.len();
        if let Some(max) = self.max_bytes {
            if self.received > max {
                return Err(Error::validation(format!(
                    "upload exceeds the limit of {} bytes",
                    max
                )));
            }
        }

        if let Some((_, file)) = self.staged.as_mut() {
            file.write_all(&frame.data).await?;
        }

        if frame.is_last {
            if let Some((_, file)) = self.staged.as_mut() {
                file.flush().await?;
            }
            self.complete = true;
        }

        Ok(())
    }

    /// Header and full payload; fails unless the terminal frame was seen
    pub async fn finish(&mut self) -> Result<(UploadHeader, Vec<u8>)> {
        let header = match (&self.header, self.complete) {
            (None, _) => return Err(Error::IncompleteUpload("no frames received".into())),
            (Some(_), false) => {
                return Err(Error::IncompleteUpload(format!(
                    "stream ended after {} bytes without a terminal frame",
                    self.received
                )))
            }
            (Some(header), true) => header.clone(),
        };

        let payload = match self.staged.take() {
            Some((path, file)) => {
                drop(file);
                tokio::fs::read(&path).await?
            }
            None => Vec::new(),
        };

        Ok((header, payload))
    }

    /// Remove the staging directory; failures are logged, never returned
    pub fn cleanup(self) {
        let Self { staging, staged, .. } = self;
        drop(staged);

        let path = staging.path().to_path_buf();
        if let Err(error) = staging.close() {
            tracing::warn!(path = %path.display(), %error, "Failed to remove upload staging directory");
        }
    }
}

/// Last path component of the client-supplied name
fn staged_file_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("upload")
        .to_string()
}
