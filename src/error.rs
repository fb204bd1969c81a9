//! Error types shared by the sync pipeline.
//!
//! `UpstreamError` is what a collaborator call (metadata API, sink) fails
//! with. `SyncError` is what a channel's pipeline fails with after the retry
//! executor has had its say. `RunError` is the only thing that escapes a run.
use thiserror::Error;

use crate::orchestrator::RunResult;
use crate::retry::{classify_status, ErrorClass};

/// Failure of a single call to an external collaborator.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// HTTP-style status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::NotFound(_) => Some(404),
            UpstreamError::Transport(_) | UpstreamError::Decode(_) => None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        classify_status(self.status())
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return UpstreamError::Decode(err.to_string());
        }
        match err.status() {
            Some(status) => UpstreamError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => UpstreamError::Transport(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for UpstreamError {
    fn from(err: sqlx::Error) -> Self {
        UpstreamError::Transport(err.to_string())
    }
}

/// Terminal failure of one pipeline step for one channel.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{operation} failed permanently: {source}")]
    Permanent {
        operation: &'static str,
        #[source]
        source: UpstreamError,
    },
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: UpstreamError,
    },
    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },
}

impl SyncError {
    /// Short label used in telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Permanent { .. } => "permanent",
            SyncError::RetryExhausted { .. } => "retry_exhausted",
            SyncError::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled { .. })
    }
}

/// Run-level failure handed back to the host.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid run configuration: {0}")]
    Configuration(String),
    #[error("all {} channels failed", .0.failed.len())]
    AllChannelsFailed(Box<RunResult>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_drive_classification() {
        for status in [429, 500, 503] {
            let err = UpstreamError::Status {
                status,
                message: "boom".into(),
            };
            assert_eq!(err.class(), ErrorClass::Transient, "status {status}");
        }
        for status in [400, 403, 404] {
            let err = UpstreamError::Status {
                status,
                message: "nope".into(),
            };
            assert_eq!(err.class(), ErrorClass::Permanent, "status {status}");
        }
    }

    #[test]
    fn not_found_is_permanent_and_transport_is_unknown() {
        assert_eq!(
            UpstreamError::NotFound("channel x".into()).class(),
            ErrorClass::Permanent
        );
        assert_eq!(
            UpstreamError::Transport("reset".into()).class(),
            ErrorClass::Unknown
        );
        assert_eq!(
            UpstreamError::Decode("eof".into()).class(),
            ErrorClass::Unknown
        );
    }

    #[test]
    fn sync_error_message_names_operation() {
        let err = SyncError::RetryExhausted {
            operation: "videos.list",
            attempts: 3,
            source: UpstreamError::Status {
                status: 503,
                message: "unavailable".into(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("videos.list"));
        assert!(text.contains("3 attempts"));
        assert_eq!(err.kind(), "retry_exhausted");
    }
}
