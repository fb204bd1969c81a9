//! Metadata retrieval: the `MetadataApi` seam plus `MetadataClient`, which
//! adds pagination, batching and retries on top of it.
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{SyncError, UpstreamError};
use crate::model::{ChannelInfo, ItemPage, RawItem};
use crate::observer::{Event, Observer, Severity};
use crate::retry::RetryExecutor;

pub mod client;
pub mod model;

pub use client::YouTubeClient;

/// Most ids the API returns per page and accepts per detail call.
pub const API_PAGE_LIMIT: u32 = 50;
pub const API_BATCH_LIMIT: usize = 50;
/// Upper bound on pages walked per collection, whatever the continuation token says.
pub const DEFAULT_MAX_PAGES: u32 = 200;

pub const PAGE_CEILING_EVENT: &str = "page ceiling reached";

/// The three raw calls of the external metadata API. One call, no retries.
#[async_trait]
pub trait MetadataApi: Send + Sync {
    /// Display name and uploads collection of a channel. Unknown channels
    /// fail with `UpstreamError::NotFound`.
    async fn channel(&self, channel_id: &str) -> Result<ChannelInfo, UpstreamError>;

    async fn upload_page(
        &self,
        collection_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ItemPage, UpstreamError>;

    /// Details for at most `API_BATCH_LIMIT` ids.
    async fn item_details(&self, item_ids: &[String]) -> Result<Vec<RawItem>, UpstreamError>;
}

/// A detail fetch that failed part-way. `items` holds what earlier batches returned.
#[derive(Debug)]
pub struct PartialFetch {
    pub items: Vec<RawItem>,
    pub error: SyncError,
}

#[derive(Clone)]
pub struct MetadataClient {
    api: Arc<dyn MetadataApi>,
    retry: RetryExecutor,
    observer: Arc<dyn Observer>,
    max_pages: u32,
}

impl MetadataClient {
    pub fn new(
        api: Arc<dyn MetadataApi>,
        retry: RetryExecutor,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            api,
            retry,
            observer,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub async fn resolve_uploads_collection(
        &self,
        channel_id: &str,
    ) -> Result<ChannelInfo, SyncError> {
        self.retry
            .execute("channels.list", || self.api.channel(channel_id))
            .await
    }

    /// Walk the collection until the upstream runs out of pages, `max_results`
    /// ids are collected, or the page ceiling is hit.
    pub async fn list_item_ids(
        &self,
        collection_id: &str,
        max_results: u32,
    ) -> Result<Vec<String>, SyncError> {
        let limit = max_results as usize;
        let mut ids: Vec<String> = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0u32;

        while ids.len() < limit {
            if pages >= self.max_pages {
                self.observer.emit(
                    Event::new(Severity::Warning, PAGE_CEILING_EVENT)
                        .label("collection_id", collection_id)
                        .label("pages", pages)
                        .label("collected", ids.len()),
                );
                break;
            }
            let remaining = (limit - ids.len()).min(API_PAGE_LIMIT as usize) as u32;
            let page_token = token.as_deref();
            let page = self
                .retry
                .execute("playlistItems.list", || {
                    self.api.upload_page(collection_id, remaining, page_token)
                })
                .await?;
            pages += 1;

            ids.extend(page.item_ids);
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        ids.truncate(limit);
        Ok(ids)
    }

    /// Fetch details in batches of `API_BATCH_LIMIT`. Result order follows
    /// the batches but carries no meaning.
    pub async fn fetch_item_details(
        &self,
        item_ids: &[String],
    ) -> Result<Vec<RawItem>, PartialFetch> {
        let mut items = Vec::with_capacity(item_ids.len());
        for batch in item_ids.chunks(API_BATCH_LIMIT) {
            match self
                .retry
                .execute("videos.list", || self.api.item_details(batch))
                .await
            {
                Ok(fetched) => items.extend(fetched),
                Err(error) => return Err(PartialFetch { items, error }),
            }
        }
        Ok(items)
    }
}
