#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use trend_tracker::model::{ChannelInfo, ItemPage, ItemStatistics, RawItem, SnapshotRecord};
use trend_tracker::observer::MemoryObserver;
use trend_tracker::retry::{RetryConfig, RetryExecutor};
use trend_tracker::sink::{SinkWriter, SnapshotSink, DEFAULT_BATCH_SIZE};
use trend_tracker::youtube::{MetadataApi, MetadataClient};
use trend_tracker::{Orchestrator, RunSettings, UpstreamError};

pub enum ChannelBehavior {
    /// Upload pages, each a list of item ids.
    Pages(Vec<Vec<String>>),
    Missing,
    Unavailable,
}

/// In-memory metadata API. Collection ids are `UU-{channel}`, page tokens `p{n}`.
#[derive(Default)]
pub struct FakeApi {
    channels: HashMap<String, ChannelBehavior>,
    /// Scripted detail outcomes, one per call; `None` lets the call through.
    detail_script: Mutex<VecDeque<Option<UpstreamError>>>,
    pub calls: Mutex<Vec<String>>,
    pub detail_batches: Mutex<Vec<Vec<String>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(self, id: &str, pages: Vec<Vec<&str>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| page.into_iter().map(str::to_string).collect())
            .collect();
        self.with_pages(id, pages)
    }

    pub fn with_pages(mut self, id: &str, pages: Vec<Vec<String>>) -> Self {
        self.channels
            .insert(id.to_string(), ChannelBehavior::Pages(pages));
        self
    }

    pub fn missing(mut self, id: &str) -> Self {
        self.channels.insert(id.to_string(), ChannelBehavior::Missing);
        self
    }

    pub fn unavailable(mut self, id: &str) -> Self {
        self.channels
            .insert(id.to_string(), ChannelBehavior::Unavailable);
        self
    }

    pub fn fail_details(self, errors: Vec<UpstreamError>) -> Self {
        self.fail_details_after(0, errors)
    }

    /// Let `successes` detail calls through, then fail with `errors` in order.
    pub fn fail_details_after(self, successes: usize, errors: Vec<UpstreamError>) -> Self {
        let script = std::iter::repeat_with(|| None)
            .take(successes)
            .chain(errors.into_iter().map(Some))
            .collect();
        Self {
            detail_script: Mutex::new(script),
            ..self
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    fn pages_for(&self, collection_id: &str) -> Vec<Vec<String>> {
        let channel = collection_id.trim_start_matches("UU-");
        match self.channels.get(channel) {
            Some(ChannelBehavior::Pages(pages)) => pages.clone(),
            _ => Vec::new(),
        }
    }
}

pub fn raw_item(id: &str) -> RawItem {
    RawItem {
        id: id.to_string(),
        title: format!("title of {id}"),
        tags: vec!["tag".into()],
        published_at: None,
        duration: "PT45S".into(),
        statistics: ItemStatistics {
            views: 100,
            likes: 10,
            comments: 1,
        },
        content_details: None,
        topic_categories: vec![],
    }
}

#[async_trait]
impl MetadataApi for FakeApi {
    async fn channel(&self, channel_id: &str) -> Result<ChannelInfo, UpstreamError> {
        self.calls.lock().await.push(format!("channel:{channel_id}"));
        match self.channels.get(channel_id) {
            Some(ChannelBehavior::Pages(_)) => Ok(ChannelInfo {
                display_name: format!("{channel_id} display"),
                uploads_collection_id: format!("UU-{channel_id}"),
            }),
            Some(ChannelBehavior::Unavailable) => Err(UpstreamError::Status {
                status: 503,
                message: "backend unavailable".into(),
            }),
            Some(ChannelBehavior::Missing) | None => {
                Err(UpstreamError::NotFound(format!("channel {channel_id}")))
            }
        }
    }

    async fn upload_page(
        &self,
        collection_id: &str,
        _page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ItemPage, UpstreamError> {
        self.calls
            .lock()
            .await
            .push(format!("page:{collection_id}:{}", page_token.unwrap_or("-")));
        let pages = self.pages_for(collection_id);
        let idx = page_token
            .and_then(|t| t.trim_start_matches('p').parse::<usize>().ok())
            .unwrap_or(0);
        let item_ids = pages
            .get(idx)
            .cloned()
            .unwrap_or_default();
        let next_page_token = (idx + 1 < pages.len()).then(|| format!("p{}", idx + 1));
        Ok(ItemPage {
            item_ids,
            next_page_token,
        })
    }

    async fn item_details(&self, item_ids: &[String]) -> Result<Vec<RawItem>, UpstreamError> {
        self.calls
            .lock()
            .await
            .push(format!("details:{}", item_ids.len()));
        if let Some(Some(err)) = self.detail_script.lock().await.pop_front() {
            return Err(err);
        }
        self.detail_batches.lock().await.push(item_ids.to_vec());
        Ok(item_ids.iter().map(|id| raw_item(id)).collect())
    }
}

/// Records every accepted insert. Scripted outcomes run first, one per call;
/// `None` lets the call through.
#[derive(Default)]
pub struct RecordingSink {
    script: Mutex<VecDeque<Option<UpstreamError>>>,
    cancel_on_insert: Option<CancellationToken>,
    pub inserts: Mutex<Vec<Vec<SnapshotRecord>>>,
}

impl RecordingSink {
    pub fn failing(errors: Vec<UpstreamError>) -> Self {
        Self::failing_after(0, errors)
    }

    /// Accept `successes` inserts, then fail with `errors` in order.
    pub fn failing_after(successes: usize, errors: Vec<UpstreamError>) -> Self {
        let script = std::iter::repeat_with(|| None)
            .take(successes)
            .chain(errors.into_iter().map(Some))
            .collect();
        Self {
            script: Mutex::new(script),
            ..Default::default()
        }
    }

    /// Cancel `token` once the first insert has been accepted.
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            cancel_on_insert: Some(token),
            ..Default::default()
        }
    }

    pub async fn inserts(&self) -> Vec<Vec<SnapshotRecord>> {
        self.inserts.lock().await.clone()
    }

    pub async fn rows(&self) -> usize {
        self.inserts.lock().await.iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl SnapshotSink for RecordingSink {
    async fn insert(&self, records: &[SnapshotRecord]) -> Result<(), UpstreamError> {
        if let Some(Some(err)) = self.script.lock().await.pop_front() {
            return Err(err);
        }
        self.inserts.lock().await.push(records.to_vec());
        if let Some(token) = &self.cancel_on_insert {
            token.cancel();
        }
        Ok(())
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub observer: Arc<MemoryObserver>,
    pub cancel: CancellationToken,
}

pub fn harness(
    api: Arc<dyn MetadataApi>,
    sink: Arc<dyn SnapshotSink>,
    settings: RunSettings,
) -> Harness {
    harness_with(
        api,
        sink,
        settings,
        CancellationToken::new(),
        DEFAULT_BATCH_SIZE,
    )
}

pub fn harness_with(
    api: Arc<dyn MetadataApi>,
    sink: Arc<dyn SnapshotSink>,
    settings: RunSettings,
    cancel: CancellationToken,
    batch_size: usize,
) -> Harness {
    let observer = Arc::new(MemoryObserver::new());
    let retry = RetryExecutor::new(fast_retry(), observer.clone(), cancel.clone());
    let client = MetadataClient::new(api, retry.clone(), observer.clone());
    let writer = SinkWriter::new(sink).with_batch_size(batch_size);
    Harness {
        orchestrator: Orchestrator::new(client, writer, retry, observer.clone(), settings),
        observer,
        cancel,
    }
}

pub fn unavailable() -> UpstreamError {
    UpstreamError::Status {
        status: 503,
        message: "backend unavailable".into(),
    }
}
