//! Batched submission of snapshot rows to the analytical store.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::UpstreamError;
use crate::model::SnapshotRecord;

/// Rows per insert call, matching the warehouse writer's default batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Append-only store. Delivery is at-least-once; deduplication on
/// `insert_id` is up to the implementation.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn insert(&self, records: &[SnapshotRecord]) -> Result<(), UpstreamError>;
}

/// A rejected chunk. Rows of the chunks before it are already in the store.
#[derive(Debug, Error)]
#[error("sink rejected a chunk after {written} rows: {source}")]
pub struct WriteError {
    pub written: usize,
    #[source]
    pub source: UpstreamError,
}

#[derive(Clone)]
pub struct SinkWriter {
    sink: Arc<dyn SnapshotSink>,
    batch_size: usize,
}

impl SinkWriter {
    pub fn new(sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            sink,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Submit `records` in `batch_size` chunks and return how many were sent.
    /// An empty slice never reaches the sink. Stops at the first rejected
    /// chunk, reporting the rows that landed before it.
    pub async fn write(&self, records: &[SnapshotRecord]) -> Result<usize, WriteError> {
        let mut written = 0;
        for chunk in records.chunks(self.batch_size) {
            if let Err(source) = self.sink.insert(chunk).await {
                return Err(WriteError { written, source });
            }
            written += chunk.len();
        }
        Ok(written)
    }
}
