//! SQLite-backed snapshot store.
//!
//! - `model`: rows as read back from `video_snapshots`.
//! - `repo`: pool setup, migrations and the SQL itself.
//!
//! `SqliteSink` adapts the repository to the pipeline's `SnapshotSink` seam.

use async_trait::async_trait;
use tracing::debug;

use crate::error::UpstreamError;
use crate::model::SnapshotRecord;
use crate::sink::SnapshotSink;

pub mod model;
pub mod repo;

pub use model::SnapshotRow;
pub use repo::*;

/// Deduplicates on `insert_id`: re-sending a row for the same day is a no-op.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: Pool,
}

impl SqliteSink {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl SnapshotSink for SqliteSink {
    async fn insert(&self, records: &[SnapshotRecord]) -> Result<(), UpstreamError> {
        let added = repo::insert_snapshots(&self.pool, records).await?;
        debug!(
            sent = records.len(),
            added,
            skipped = (records.len() as u64).saturating_sub(added),
            "snapshot insert"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use sqlx::sqlite::SqlitePoolOptions;

    fn record(video_id: &str) -> SnapshotRecord {
        SnapshotRecord {
            dt: NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            channel_id: "UCx".into(),
            video_id: video_id.into(),
            title: String::new(),
            channel_name: "X".into(),
            tags: vec![],
            is_short: false,
            views: 1,
            likes: 0,
            comments: 0,
            published_at: None,
            created_at: Utc::now(),
            duration_sec: None,
            content_details: None,
            topic_details: vec![],
            insert_id: format!("2025-03-09:UCx:{video_id}"),
        }
    }

    #[tokio::test]
    async fn resent_batch_is_accepted_and_adds_nothing() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        let sink = SqliteSink::new(pool.clone());
        let batch = vec![record("v1"), record("v2")];

        sink.insert(&batch).await.unwrap();
        sink.insert(&batch).await.unwrap();
        assert_eq!(count_snapshots(&pool).await.unwrap(), 2);

        let added = insert_snapshots(&pool, &[record("v2"), record("v3")])
            .await
            .unwrap();
        assert_eq!(added, 1);
    }
}
