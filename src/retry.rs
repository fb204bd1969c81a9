//! Bounded exponential-backoff retries for upstream calls.
//!
//! One `RetryExecutor` is built per run and shared by every call site; the
//! backoff math lives in `BackoffPolicy` so it can be checked without a clock.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{SyncError, UpstreamError};
use crate::observer::{Event, Observer, Severity};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Message of the event emitted once per attempt.
pub const ATTEMPT_EVENT: &str = "retry attempt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
    /// No recognizable status (network, decoding). Retried like `Transient`.
    Unknown,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorClass::Permanent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Permanent => "permanent",
            ErrorClass::Unknown => "unknown",
        }
    }
}

/// 429 and 5xx are transient, every other status is permanent, no status is unknown.
pub fn classify_status(status: Option<u16>) -> ErrorClass {
    match status {
        Some(429) | Some(500..=599) => ErrorClass::Transient,
        Some(_) => ErrorClass::Permanent,
        None => ErrorClass::Unknown,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl BackoffPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based; 0 counts as 1).
    ///
    /// `min(initial_delay * multiplier^(attempt-1), max_delay)`, saturating to
    /// `max_delay` when the product overflows.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = self.multiplier.powi(exponent.min(i32::MAX as u32) as i32);
        let nanos = self.initial_delay.as_nanos() as f64 * factor;
        let cap = self.max_delay.as_nanos() as f64;
        if !nanos.is_finite() || nanos >= cap {
            return self.max_delay;
        }
        Duration::from_nanos(nanos.max(0.0) as u64)
    }
}

/// Runs upstream calls under a `RetryConfig`, reporting every attempt to the observer.
#[derive(Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    observer: Arc<dyn Observer>,
    cancel: CancellationToken,
}

impl RetryExecutor {
    pub fn new(
        config: RetryConfig,
        observer: Arc<dyn Observer>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            observer,
            cancel,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `op` until it succeeds, fails permanently, runs out of attempts or
    /// the run is cancelled. Cancellation interrupts both the call in flight
    /// and the backoff sleep.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &'static str,
        mut op: F,
    ) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let policy = self.config.policy();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(SyncError::Cancelled { operation });
            }
            attempt += 1;

            let started = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(SyncError::Cancelled { operation }),
                res = op() => res,
            };
            let elapsed_ms = started.elapsed().as_millis();

            let err = match outcome {
                Ok(value) => {
                    self.observer.emit(
                        Event::new(Severity::Debug, ATTEMPT_EVENT)
                            .label("operation", operation)
                            .label("attempt", attempt)
                            .label("max_attempts", max_attempts)
                            .label("elapsed_ms", elapsed_ms)
                            .label("outcome", "ok"),
                    );
                    return Ok(value);
                }
                Err(err) => err,
            };

            let class = err.class();
            let base = Event::new(Severity::Error, ATTEMPT_EVENT)
                .label("operation", operation)
                .label("attempt", attempt)
                .label("max_attempts", max_attempts)
                .label("elapsed_ms", elapsed_ms)
                .label("class", class.as_str())
                .label("error", &err);

            if !class.is_retryable() {
                self.observer.emit(base.label("outcome", "permanent"));
                return Err(SyncError::Permanent {
                    operation,
                    source: err,
                });
            }
            if attempt >= max_attempts {
                self.observer.emit(base.label("outcome", "exhausted"));
                return Err(SyncError::RetryExhausted {
                    operation,
                    attempts: attempt,
                    source: err,
                });
            }

            let delay = policy.delay(attempt);
            let mut event = base
                .label("outcome", "retry")
                .label("delay_ms", delay.as_millis());
            event.severity = Severity::Warning;
            self.observer.emit(event);

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(SyncError::Cancelled { operation }),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
