//! Chunked artifact upload
//!
//! A payload larger than one transaction is split into `ceil(len / M)`
//! consecutive chunks. The first chunk creates the file; the rest are
//! appended strictly in order, each append waiting for the previous receipt.
//! An interrupted upload is reported with the file id and the number of
//! committed chunks and is never deleted automatically.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::UploadError;
use crate::session::LedgerSession;

/// A fully assembled ledger file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerFile {
    pub file_id: String,
    pub total_bytes: u64,
    pub chunk_count: usize,
}

/// Byte ranges of each chunk, in upload order
pub fn chunk_plan(len: usize, chunk_size: usize) -> Vec<Range<usize>> {
    if chunk_size == 0 {
        return Vec::new();
    }
    (0..len.div_ceil(chunk_size))
        .map(|i| {
            let start = i * chunk_size;
            start..(start + chunk_size).min(len)
        })
        .collect()
}

/// Uploads byte payloads through a session
pub struct ArtifactUploader<'a> {
    session: &'a LedgerSession,
    chunk_size: usize,
}

impl<'a> ArtifactUploader<'a> {
    /// Uploader using the network's maximum chunk size
    pub fn new(session: &'a LedgerSession) -> Self {
        Self {
            chunk_size: session.profile().max_chunk_size,
            session,
        }
    }

    /// Use a smaller chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Upload `payload` as one file
    pub async fn upload(&self, payload: &[u8]) -> Result<LedgerFile, UploadError> {
        let limit = self.session.profile().max_chunk_size;
        if self.chunk_size == 0 || self.chunk_size > limit {
            return Err(UploadError::InvalidChunkSize {
                size: self.chunk_size,
                limit,
            });
        }
        if payload.is_empty() {
            return Err(UploadError::EmptyArtifact);
        }

        let plan = chunk_plan(payload.len(), self.chunk_size);
        let total_chunks = plan.len();
        tracing::debug!(bytes = payload.len(), chunks = total_chunks, "uploading artifact");

        let mut chunks = plan.into_iter();
        let first = match chunks.next() {
            Some(range) => range,
            None => return Err(UploadError::EmptyArtifact),
        };
        let file_id = self
            .session
            .create_file(&payload[first])
            .await
            .map_err(UploadError::Create)?;

        let mut committed = 1;
        for range in chunks {
            let offset = range.start;
            if let Err(source) = self.session.append_file(&file_id, &payload[range]).await {
                tracing::warn!(
                    file_id = %file_id,
                    committed,
                    total_chunks,
                    "upload interrupted; partial file left in place"
                );
                return Err(UploadError::Partial {
                    file_id,
                    chunks_committed: committed,
                    total_chunks,
                    source,
                });
            }
            committed += 1;
            tracing::debug!(file_id = %file_id, offset, chunk = committed, "chunk committed");
        }

        tracing::info!(
            file_id = %file_id,
            bytes = payload.len(),
            chunks = total_chunks,
            "artifact uploaded"
        );
        Ok(LedgerFile {
            file_id,
            total_bytes: payload.len() as u64,
            chunk_count: total_chunks,
        })
    }
}
