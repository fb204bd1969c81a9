use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use trend_tracker::config;
use trend_tracker::db::{self, SqliteSink};
use trend_tracker::observer::{Observer, TracingObserver};
use trend_tracker::retry::RetryExecutor;
use trend_tracker::sink::SinkWriter;
use trend_tracker::youtube::{MetadataClient, YouTubeClient};
use trend_tracker::{Orchestrator, RunError, RunResult};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Snapshot statistics for the configured channels into the trends store and exit"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Snapshot date (YYYY-MM-DD); defaults to today in UTC
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let run_date = args.date.unwrap_or_else(|| Utc::now().date_naive());

    let pool = db::init_pool(&cfg.sink.database_url).await?;
    db::run_migrations(&pool).await?;

    let cancel = CancellationToken::new();
    spawn_cancel_on_ctrl_c(cancel.clone());
    spawn_deadline(cancel.clone(), cfg.fetch_timeout());

    let observer: Arc<dyn Observer> = Arc::new(TracingObserver);
    let retry = RetryExecutor::new(cfg.retry_config(), observer.clone(), cancel.clone());
    let api = YouTubeClient::new(cfg.youtube.api_key.clone(), cfg.request_timeout())
        .context("failed to build YouTube client")?;
    let client = MetadataClient::new(Arc::new(api), retry.clone(), observer.clone())
        .with_max_pages(cfg.app.max_pages);
    let writer =
        SinkWriter::new(Arc::new(SqliteSink::new(pool))).with_batch_size(cfg.sink.batch_size);
    let orchestrator = Orchestrator::new(client, writer, retry, observer, cfg.run_settings());

    let channels = cfg.enabled_channels();
    info!(channels = channels.len(), %run_date, "starting channel sync");
    let outcome = orchestrator.run(&channels, run_date).await;
    cancel.cancel();

    match outcome {
        Ok(result) => {
            log_failures(&result);
            info!(
                run_id = %result.run_id,
                succeeded = result.succeeded.len(),
                failed = result.failed.len(),
                snapshots = result.snapshots_written,
                "channel sync completed"
            );
            Ok(())
        }
        Err(RunError::AllChannelsFailed(result)) => {
            log_failures(&result);
            error!(run_id = %result.run_id, "every channel failed");
            Err(anyhow!("all {} channels failed", result.failed.len()))
        }
        Err(err) => Err(err.into()),
    }
}

fn log_failures(result: &RunResult) {
    for (channel_id, err) in &result.failed {
        warn!(%channel_id, kind = err.kind(), error = %err, "channel failed");
    }
}

fn spawn_cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if res.is_ok() {
                    warn!("shutdown requested, finishing current channel");
                    cancel.cancel();
                }
            }
            _ = cancel.cancelled() => {}
        }
    });
}

fn spawn_deadline(cancel: CancellationToken, timeout: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                warn!(?timeout, "fetch timeout elapsed, cancelling run");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    });
}
