//! Row models returned by the snapshot repository.

use chrono::{DateTime, NaiveDate, Utc};

/// A stored snapshot. List columns stay JSON-encoded text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub insert_id: String,
    pub dt: NaiveDate,
    pub channel_id: String,
    pub video_id: String,
    pub title: Option<String>,
    pub channel_name: Option<String>,
    pub tags: String,
    pub is_short: bool,
    pub views: Option<i64>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub duration_sec: Option<i64>,
    pub content_details: Option<String>,
    pub topic_details: String,
}

impl SnapshotRow {
    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }
}
