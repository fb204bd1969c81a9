//! One pass over the configured channels: fetch, transform, write.
//!
//! A channel's failure is recorded and the run moves on. The run itself only
//! fails when there was nothing to do or every channel failed.
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::error::{RunError, SyncError};
use crate::model::{Channel, SnapshotRecord};
use crate::observer::{Event, Observer, Severity};
use crate::retry::RetryExecutor;
use crate::sink::SinkWriter;
use crate::snapshot::{build_snapshots, ChannelContext};
use crate::youtube::{MetadataClient, PartialFetch};

pub const RUN_STARTED_EVENT: &str = "run started";
pub const CHANNEL_EVENT: &str = "channel finished";
pub const RUN_EVENT: &str = "run finished";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Most items listed per channel.
    pub max_results: u32,
    /// Channels processed at once. 1 keeps the run strictly sequential.
    pub concurrency: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_results: 10,
            concurrency: 1,
        }
    }
}

#[derive(Debug)]
pub struct RunResult {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    pub succeeded: Vec<String>,
    pub failed: BTreeMap<String, SyncError>,
    pub snapshots_written: usize,
}

impl RunResult {
    fn new(run_date: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            run_date,
            succeeded: Vec::new(),
            failed: BTreeMap::new(),
            snapshots_written: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.succeeded.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    fn record(&mut self, outcome: ChannelOutcome) {
        self.snapshots_written += outcome.written;
        match outcome.result {
            Ok(()) => self.succeeded.push(outcome.channel_id),
            Err(err) => {
                self.failed.insert(outcome.channel_id, err);
            }
        }
    }
}

struct ChannelOutcome {
    channel_id: String,
    written: usize,
    result: Result<(), SyncError>,
}

impl ChannelOutcome {
    fn failed(channel: &Channel, written: usize, err: SyncError) -> Self {
        Self {
            channel_id: channel.id.clone(),
            written,
            result: Err(err),
        }
    }
}

pub struct Orchestrator {
    client: MetadataClient,
    writer: SinkWriter,
    retry: RetryExecutor,
    observer: Arc<dyn Observer>,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(
        client: MetadataClient,
        writer: SinkWriter,
        retry: RetryExecutor,
        observer: Arc<dyn Observer>,
        settings: RunSettings,
    ) -> Self {
        Self {
            client,
            writer,
            retry,
            observer,
            settings,
        }
    }

    pub async fn run(
        &self,
        channels: &[Channel],
        run_date: NaiveDate,
    ) -> Result<RunResult, RunError> {
        let mut seen = HashSet::new();
        let enabled: Vec<&Channel> = channels
            .iter()
            .filter(|c| c.enabled && seen.insert(c.id.as_str()))
            .collect();
        if enabled.is_empty() {
            return Err(RunError::Configuration("no enabled channels".into()));
        }
        if self.settings.max_results == 0 {
            return Err(RunError::Configuration("max_results must be > 0".into()));
        }

        let mut result = RunResult::new(run_date);
        self.observer.emit(
            Event::new(Severity::Info, RUN_STARTED_EVENT)
                .label("run_id", result.run_id)
                .label("run_date", run_date)
                .label("channels", enabled.len()),
        );

        let mut outcomes = stream::iter(enabled)
            .map(|channel| self.sync_channel(channel, run_date))
            .buffer_unordered(self.settings.concurrency.max(1));
        while let Some(outcome) = outcomes.next().await {
            self.report_channel(&result, &outcome);
            result.record(outcome);
        }

        let severity = if result.is_success() {
            Severity::Info
        } else {
            Severity::Error
        };
        self.observer.emit(
            Event::new(severity, RUN_EVENT)
                .label("run_id", result.run_id)
                .label("run_date", run_date)
                .label("succeeded", result.succeeded.len())
                .label("failed", result.failed.len())
                .label("snapshots_written", result.snapshots_written),
        );

        if result.is_success() {
            Ok(result)
        } else {
            Err(RunError::AllChannelsFailed(Box::new(result)))
        }
    }

    async fn sync_channel(&self, channel: &Channel, run_date: NaiveDate) -> ChannelOutcome {
        if self.retry.cancel_token().is_cancelled() {
            return ChannelOutcome::failed(
                channel,
                0,
                SyncError::Cancelled {
                    operation: "channel sync",
                },
            );
        }

        let info = match self.client.resolve_uploads_collection(&channel.id).await {
            Ok(info) => info,
            Err(err) => return ChannelOutcome::failed(channel, 0, err),
        };
        let ids = match self
            .client
            .list_item_ids(&info.uploads_collection_id, self.settings.max_results)
            .await
        {
            Ok(ids) => ids,
            Err(err) => return ChannelOutcome::failed(channel, 0, err),
        };
        // Items from batches that succeeded are still written when a later batch fails.
        let (items, fetch_error) = match self.client.fetch_item_details(&ids).await {
            Ok(items) => (items, None),
            Err(PartialFetch { items, error }) => (items, Some(error)),
        };

        let display_name = match (info.display_name.is_empty(), channel.name.as_deref()) {
            (true, Some(name)) => name,
            _ => info.display_name.as_str(),
        };
        let ctx = ChannelContext {
            channel_id: &channel.id,
            display_name,
            run_date,
        };
        let records = build_snapshots(ctx, &items, Utc::now());

        let written = match self.write_records(&records).await {
            Ok(n) => n,
            Err((landed, err)) => return ChannelOutcome::failed(channel, landed, err),
        };

        ChannelOutcome {
            channel_id: channel.id.clone(),
            written,
            result: fetch_error.map_or(Ok(()), Err),
        }
    }

    /// Write under the shared retry policy. On failure, also returns how many
    /// rows reached the store; every attempt resends from the first chunk.
    async fn write_records(
        &self,
        records: &[SnapshotRecord],
    ) -> Result<usize, (usize, SyncError)> {
        let landed = AtomicUsize::new(0);
        let (writer, landed_ref) = (&self.writer, &landed);
        let outcome = self
            .retry
            .execute("sink.write", || async move {
                writer.write(records).await.map_err(|err| {
                    landed_ref.fetch_max(err.written, Ordering::Relaxed);
                    err.source
                })
            })
            .await;
        outcome.map_err(|err| (landed.load(Ordering::Relaxed), err))
    }

    fn report_channel(&self, result: &RunResult, outcome: &ChannelOutcome) {
        let event = match &outcome.result {
            Ok(()) => Event::new(Severity::Info, CHANNEL_EVENT).label("outcome", "success"),
            Err(err) => Event::new(Severity::Error, CHANNEL_EVENT)
                .label("outcome", "failure")
                .label("error_kind", err.kind())
                .label("error", err),
        };
        self.observer.emit(
            event
                .label("run_id", result.run_id)
                .label("channel_id", &outcome.channel_id)
                .label("items", outcome.written),
        );
    }
}
