//! Error types for monitors.

use std::fmt::Display;

use thiserror::Error;

/// How an error affects the monitor that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A single acquisition failed; the slot keeps its previous fragment and
    /// the monitor retries on its next cycle.
    Transient,
    /// The monitor's source is gone; the slot freezes and the monitor stops.
    Fatal,
}

/// Errors that can occur while a monitor acquires or decodes its snapshots.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// One poll of the source failed.
    #[error("acquisition failed: {0}")]
    Acquire(String),

    /// Re-querying state over an open connection failed.
    #[error("query failed: {0}")]
    Query(String),

    /// The external process could not be started.
    #[error("failed to start `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    /// A message from a stream could not be decoded.
    #[error("failed to decode message: {0}")]
    Decode(String),

    /// Reading from a stream failed.
    #[error("read error: {0}")]
    Read(String),

    /// The stream ended.
    #[error("stream closed: {0}")]
    StreamClosed(String),

    /// The subscription connection failed or was lost.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The monitor returned without being stopped or cancelled.
    #[error("monitor exited unexpectedly")]
    Exited,
}

impl MonitorError {
    pub fn acquire(err: impl Display) -> Self {
        MonitorError::Acquire(err.to_string())
    }

    pub fn query(err: impl Display) -> Self {
        MonitorError::Query(err.to_string())
    }

    pub fn spawn(program: &str, err: impl Display) -> Self {
        MonitorError::Spawn {
            program: program.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            MonitorError::Acquire(_) | MonitorError::Query(_) => Severity::Transient,
            MonitorError::Spawn { .. }
            | MonitorError::Decode(_)
            | MonitorError::Read(_)
            | MonitorError::StreamClosed(_)
            | MonitorError::Connection(_)
            | MonitorError::Exited => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
