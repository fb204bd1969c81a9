//! Daily channel snapshot sync: pull item metadata and statistics for a set
//! of channels from the YouTube Data API and append them to an analytical
//! store, one idempotent row per item per day.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod observer;
pub mod orchestrator;
pub mod retry;
pub mod sink;
pub mod snapshot;
pub mod youtube;

pub use error::{RunError, SyncError, UpstreamError};
pub use orchestrator::{Orchestrator, RunResult, RunSettings};
