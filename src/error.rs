//! Cycle failure taxonomy.
//!
//! Components propagate `anyhow::Error` internally; at the supervisor boundary
//! every failure is classified into one of five kinds. The kind decides the
//! supervisor's reaction: the first three abort the cycle and restart it after
//! the retry delay, the last two are absorbed inside the cycle and only logged.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Capture open/reconnect failed. Retryable; loop back with delay.
    StreamUnavailable,
    /// Sampling failed (source ended, decode error). Retryable; skip cycle.
    FrameUnavailable,
    /// External detector error. Retryable; skip cycle, no partial results.
    DetectionFailed,
    /// Storage write/upload failed. Non-fatal; event stays unrecorded and no
    /// notification is sent.
    PersistenceFailed,
    /// Downstream send failed. Non-fatal; logged only, never retried.
    NotificationFailed,
}

impl FailureKind {
    /// True when the supervisor should abort the current cycle and retry.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FailureKind::StreamUnavailable
                | FailureKind::FrameUnavailable
                | FailureKind::DetectionFailed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::StreamUnavailable => "stream_unavailable",
            FailureKind::FrameUnavailable => "frame_unavailable",
            FailureKind::DetectionFailed => "detection_failed",
            FailureKind::PersistenceFailed => "persistence_failed",
            FailureKind::NotificationFailed => "notification_failed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified cycle failure: the taxonomy kind plus the underlying cause.
#[derive(Debug)]
pub struct CycleFailure {
    pub kind: FailureKind,
    pub cause: anyhow::Error,
}

impl CycleFailure {
    pub fn new(kind: FailureKind, cause: anyhow::Error) -> Self {
        Self { kind, cause }
    }

    pub fn stream_unavailable(cause: anyhow::Error) -> Self {
        Self::new(FailureKind::StreamUnavailable, cause)
    }

    pub fn frame_unavailable(cause: anyhow::Error) -> Self {
        Self::new(FailureKind::FrameUnavailable, cause)
    }

    pub fn detection_failed(cause: anyhow::Error) -> Self {
        Self::new(FailureKind::DetectionFailed, cause)
    }

    pub fn persistence_failed(cause: anyhow::Error) -> Self {
        Self::new(FailureKind::PersistenceFailed, cause)
    }

    pub fn notification_failed(cause: anyhow::Error) -> Self {
        Self::new(FailureKind::NotificationFailed, cause)
    }
}

impl fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.kind, self.cause)
    }
}

impl std::error::Error for CycleFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}
