use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::model::{ApiErrorEnvelope, ChannelListResp, PlaylistItemListResp, VideoListResp};
use super::MetadataApi;
use crate::error::UpstreamError;
use crate::model::{ChannelInfo, ItemPage, RawItem};

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";

/// reqwest-backed `MetadataApi` for the YouTube Data API v3.
#[derive(Clone)]
pub struct YouTubeClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YouTubeClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(YOUTUBE_API_BASE)
            .map_err(|e| UpstreamError::Transport(format!("invalid YouTube base URL: {e}")))?;
        Self::with_base_url(api_key, base_url, timeout)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: Url,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .user_agent(concat!("trend-tracker/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn build_request(
        &self,
        resource: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Request, UpstreamError> {
        let endpoint = self
            .base_url
            .join(resource)
            .map_err(|e| UpstreamError::Transport(format!("invalid YouTube base URL: {e}")))?;
        Ok(self
            .http
            .get(endpoint)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .header("Accept", "application/json")
            .build()?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let request = self.build_request(resource, params)?;
        debug!(resource, ?params, "sending youtube request");
        let res = self.http.execute(request).await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or(body);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = res.text().await?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MetadataApi for YouTubeClient {
    #[instrument(skip(self))]
    async fn channel(&self, channel_id: &str) -> Result<ChannelInfo, UpstreamError> {
        let resp: ChannelListResp = self
            .get_json(
                "channels",
                &[
                    ("part", "snippet,contentDetails".to_string()),
                    ("id", channel_id.to_string()),
                ],
            )
            .await?;
        let channel = resp
            .items
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::NotFound(format!("channel {channel_id}")))?;
        Ok(ChannelInfo {
            display_name: channel.snippet.map(|s| s.title).unwrap_or_default(),
            uploads_collection_id: channel.content_details.related_playlists.uploads,
        })
    }

    #[instrument(skip(self))]
    async fn upload_page(
        &self,
        collection_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ItemPage, UpstreamError> {
        let mut params = vec![
            ("part", "contentDetails".to_string()),
            ("playlistId", collection_id.to_string()),
            ("maxResults", page_size.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        let resp: PlaylistItemListResp = self.get_json("playlistItems", &params).await?;
        Ok(ItemPage {
            item_ids: resp
                .items
                .into_iter()
                .map(|it| it.content_details.video_id)
                .collect(),
            next_page_token: resp.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    #[instrument(skip_all, fields(count = item_ids.len()))]
    async fn item_details(&self, item_ids: &[String]) -> Result<Vec<RawItem>, UpstreamError> {
        let resp: VideoListResp = self
            .get_json(
                "videos",
                &[
                    (
                        "part",
                        "snippet,statistics,contentDetails,topicDetails".to_string(),
                    ),
                    ("id", item_ids.join(",")),
                ],
            )
            .await?;
        Ok(resp.items.into_iter().map(RawItem::from).collect())
    }
}
