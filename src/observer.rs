//! Structured telemetry emitted by the sync pipeline.
//!
//! The pipeline never writes to a logger directly; it hands `Event`s to the
//! `Observer` it was constructed with. Hosts decide where those go.
use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Event {
    pub severity: Severity,
    pub message: String,
    pub labels: BTreeMap<String, String>,
}

impl Event {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn label(mut self, key: &str, value: impl ToString) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

pub trait Observer: Send + Sync {
    fn emit(&self, event: Event);
}

/// Forwards events to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn emit(&self, event: Event) {
        let Event {
            severity,
            message,
            labels,
        } = event;
        match severity {
            Severity::Debug => debug!(?labels, "{}", message),
            Severity::Info => info!(?labels, "{}", message),
            Severity::Warning => warn!(?labels, "{}", message),
            Severity::Error => error!(?labels, "{}", message),
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryObserver {
    events: Mutex<Vec<Event>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Events whose message equals `message`.
    pub fn named(&self, message: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.message == message)
            .collect()
    }
}

impl Observer for MemoryObserver {
    fn emit(&self, event: Event) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
