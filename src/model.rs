use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// A configured content source. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Channel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            enabled: true,
        }
    }
}

/// What the API tells us about a channel before listing its uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub display_name: String,
    pub uploads_collection_id: String,
}

/// One page of upload item ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPage {
    pub item_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemStatistics {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
}

/// An item as returned by the batch detail call, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawItem {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// ISO 8601 duration as sent by the API, e.g. `PT4M13S`.
    pub duration: String,
    pub statistics: ItemStatistics,
    pub content_details: Option<serde_json::Value>,
    pub topic_categories: Vec<String>,
}

/// Row appended to the analytical store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotRecord {
    /// Partition key: the run's calendar date.
    pub dt: NaiveDate,
    pub channel_id: String,
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    pub tags: Vec<String>,
    pub is_short: bool,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub duration_sec: Option<i64>,
    pub content_details: Option<String>,
    pub topic_details: Vec<String>,
    /// Deterministic key over `(dt, channel_id, video_id)`.
    pub insert_id: String,
}
