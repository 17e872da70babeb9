//! Log fetch contract.
//!
//! A `LogFetcher` is stateless: every call names the owner and the cursor to
//! read from. Sessions hold the state and decide what to do with the result.

use async_trait::async_trait;
use std::fmt;

use runlog_protocol::{ExecutionStatus, OwnerKind};

use super::cursor::Cursor;

/// The image or job whose log is being tailed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: String,
}

impl OwnerRef {
    pub fn new(kind: OwnerKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn image(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::Image, id)
    }

    pub fn job(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::Job, id)
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// One fetch worth of log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchBatch {
    /// Lines at or after the requested cursor, in stream order.
    pub lines: Vec<String>,
    /// Cursor to request next; never behind the requested one.
    pub next_cursor: Cursor,
    /// Owner status at fetch time, when the source reports one.
    pub status: Option<ExecutionStatus>,
}

impl FetchBatch {
    pub fn new(lines: Vec<String>, next_cursor: Cursor, status: Option<ExecutionStatus>) -> Self {
        Self {
            lines,
            next_cursor,
            status,
        }
    }
}

/// Fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The owner does not exist. Fatal to the session.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network or server trouble. Retried on the next tick.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The response did not have the expected shape. Retried like a
    /// transient failure but reported separately.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl FetchError {
    /// Whether the session must stop on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Source of log batches.
#[async_trait]
pub trait LogFetcher: Send + Sync {
    /// Fetch the lines available at or after `cursor`.
    async fn fetch(&self, owner: &OwnerRef, cursor: Cursor) -> Result<FetchBatch, FetchError>;
}
