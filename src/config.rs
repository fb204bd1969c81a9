//! Configuration loader and validator for the channel sync.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::model::Channel;
use crate::orchestrator::RunSettings;
use crate::retry::RetryConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub app: App,
    pub youtube: YouTube,
    #[serde(default)]
    pub retry: Retry,
    pub sink: Sink,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

/// Run-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub max_videos_per_channel: u32,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

/// YouTube Data API settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YouTube {
    pub api_key: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for YouTube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTube")
            .field("api_key", &"[REDACTED]")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Backoff settings shared by every upstream call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Retry {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for Retry {
    fn default() -> Self {
        let d = RetryConfig::default();
        Self {
            max_attempts: d.max_attempts,
            initial_delay_ms: d.initial_delay.as_millis() as u64,
            max_delay_ms: d.max_delay.as_millis() as u64,
            multiplier: d.multiplier,
        }
    }
}

/// Snapshot store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sink {
    pub database_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_fetch_timeout_secs() -> u64 {
    300
}

fn default_concurrency() -> usize {
    1
}

fn default_max_pages() -> u32 {
    crate::youtube::DEFAULT_MAX_PAGES
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    crate::sink::DEFAULT_BATCH_SIZE
}

impl Config {
    pub fn enabled_channels(&self) -> Vec<Channel> {
        self.channels.iter().filter(|c| c.enabled).cloned().collect()
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            multiplier: self.retry.multiplier,
        }
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            max_results: self.app.max_videos_per_channel,
            concurrency: self.app.concurrency,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.app.fetch_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.youtube.request_timeout_secs)
    }

    /// Apply `YOUTUBE_API_KEY`, `MAX_VIDEOS_PER_CHANNEL` and `DATABASE_URL`.
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("YOUTUBE_API_KEY").filter(|v| !v.is_empty()) {
            self.youtube.api_key = key;
        }
        if let Some(max) = lookup("MAX_VIDEOS_PER_CHANNEL").and_then(|v| v.parse().ok()) {
            self.app.max_videos_per_channel = max;
        }
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.sink.database_url = url;
        }
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env(|name| std::env::var(name).ok());
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.youtube.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("youtube.api_key must be non-empty"));
    }
    if cfg.app.max_videos_per_channel == 0 {
        return Err(ConfigError::Invalid("app.max_videos_per_channel must be > 0"));
    }
    if cfg.app.concurrency == 0 {
        return Err(ConfigError::Invalid("app.concurrency must be > 0"));
    }
    if cfg.app.max_pages == 0 {
        return Err(ConfigError::Invalid("app.max_pages must be > 0"));
    }

    if cfg.retry.max_attempts == 0 {
        return Err(ConfigError::Invalid("retry.max_attempts must be > 0"));
    }
    if !(cfg.retry.multiplier >= 1.0) {
        return Err(ConfigError::Invalid("retry.multiplier must be >= 1.0"));
    }
    if cfg.retry.initial_delay_ms > cfg.retry.max_delay_ms {
        return Err(ConfigError::Invalid(
            "retry.initial_delay_ms must not exceed retry.max_delay_ms",
        ));
    }

    if cfg.sink.database_url.trim().is_empty() {
        return Err(ConfigError::Invalid("sink.database_url must be non-empty"));
    }
    if cfg.sink.batch_size == 0 {
        return Err(ConfigError::Invalid("sink.batch_size must be > 0"));
    }

    let enabled: Vec<&Channel> = cfg.channels.iter().filter(|c| c.enabled).collect();
    if enabled.iter().any(|c| c.id.trim().is_empty()) {
        return Err(ConfigError::Invalid("channels[].id must be non-empty"));
    }
    if enabled.is_empty() {
        return Err(ConfigError::Invalid("at least one enabled channel is required"));
    }

    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"app:
  max_videos_per_channel: 10
  fetch_timeout_secs: 300
  concurrency: 1
  max_pages: 200

youtube:
  api_key: "YOUR_YOUTUBE_API_KEY"
  request_timeout_secs: 30

retry:
  max_attempts: 5
  initial_delay_ms: 1000
  max_delay_ms: 30000
  multiplier: 2.0

sink:
  database_url: "sqlite://./data/trends.db"
  batch_size: 500

channels:
  - id: "UC_x5XG1OV2P6uZZ5FSM9Ttw"
    name: "Google for Developers"
    enabled: true
  - id: "UCVHFbqXqoYvEWM1Ddxl0QDg"
    enabled: false
"#
}
