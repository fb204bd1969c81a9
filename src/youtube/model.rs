//! Wire types for the subset of the YouTube Data API v3 we read.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::{ItemStatistics, RawItem};

#[derive(Deserialize, Debug)]
pub struct ChannelListResp {
    #[serde(default)]
    pub items: Vec<ChannelResource>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResource {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<ChannelSnippet>,
    pub content_details: ChannelContentDetails,
}

#[derive(Deserialize, Debug)]
pub struct ChannelSnippet {
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Deserialize, Debug)]
pub struct RelatedPlaylists {
    pub uploads: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemListResp {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemContentDetails {
    pub video_id: String,
}

#[derive(Deserialize, Debug)]
pub struct VideoListResp {
    #[serde(default)]
    pub items: Vec<VideoResource>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VideoResource {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<VideoSnippet>,
    #[serde(default)]
    pub statistics: Option<VideoStatistics>,
    #[serde(default)]
    pub content_details: Option<Value>,
    #[serde(default)]
    pub topic_details: Option<TopicDetails>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Counts arrive as decimal strings; hidden counts are omitted entirely.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    #[serde(default, deserialize_with = "de_count")]
    pub view_count: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub like_count: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub comment_count: u64,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetails {
    #[serde(default)]
    pub topic_categories: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Text(String),
        Number(u64),
    }
    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl From<VideoResource> for RawItem {
    fn from(v: VideoResource) -> Self {
        let snippet = v.snippet;
        let stats = v.statistics.unwrap_or_default();
        let duration = v
            .content_details
            .as_ref()
            .and_then(|cd| cd.get("duration"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        RawItem {
            id: v.id,
            title: snippet.as_ref().map(|s| s.title.clone()).unwrap_or_default(),
            tags: snippet.as_ref().map(|s| s.tags.clone()).unwrap_or_default(),
            published_at: snippet.and_then(|s| s.published_at),
            duration,
            statistics: ItemStatistics {
                views: stats.view_count,
                likes: stats.like_count,
                comments: stats.comment_count,
            },
            content_details: v.content_details,
            topic_categories: v
                .topic_details
                .map(|t| t.topic_categories)
                .unwrap_or_default(),
        }
    }
}
