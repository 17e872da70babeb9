//! Tail session state machine
//!
//! Session states: IDLE → POLLING → STOPPED
//!
//! A session owns the transcript and the cursor for one owner. It does no I/O:
//! the driver feeds it fetch results through [`TailSession::apply`] and the
//! returned [`Step`] says whether another fetch should be scheduled.
//!
//! ## Stopping
//!
//! - A batch carrying a terminal status stops the session after the batch is
//!   appended, so trailing lines are kept.
//! - A batch without status falls back to the progress-stall rule: stop once
//!   it returns the same cursor as the fetch before it, provided that fetch
//!   carried no status either. A status-bearing batch is never a stall
//!   reference.
//! - `NotFound` stops immediately.
//! - Transient and protocol failures are retried until
//!   `max_consecutive_failures` of them arrive in a row.

use runlog_protocol::ExecutionStatus;
use tracing::{debug, error, info, warn};

use super::cursor::Cursor;
use super::fetcher::{FetchBatch, FetchError, OwnerRef};
use super::oracle::{classify, is_success};
use super::policy::TailPolicy;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, first fetch not completed yet
    Idle,
    /// At least one fetch completed and more are expected
    Polling,
    /// No further fetches will be issued
    Stopped(StopReason),
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The owner reached a terminal status.
    Terminal(ExecutionStatus),
    /// A stream without status made no progress between two fetches.
    Stalled,
    /// The owner does not exist.
    NotFound,
    /// Too many consecutive fetch failures.
    Unavailable,
}

impl StopReason {
    /// Whether the tailed execution finished without error.
    pub fn is_success(&self) -> bool {
        match self {
            StopReason::Terminal(status) => is_success(*status),
            StopReason::Stalled => true,
            StopReason::NotFound | StopReason::Unavailable => false,
        }
    }
}

/// What the driver should do after applying a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop(StopReason),
}

/// Per-owner tail state.
#[derive(Debug)]
pub struct TailSession {
    /// Owner being tailed
    owner: OwnerRef,

    /// Failure budget from the policy
    max_consecutive_failures: u32,

    state: SessionState,

    /// Cursor for the next fetch
    cursor: Cursor,

    /// `next_cursor` of the last successful fetch if it carried no status
    /// (stall detection)
    previous_next_cursor: Option<Cursor>,

    /// Accumulated lines, append-only
    transcript: Vec<String>,

    /// Most recent status reported by a fetch
    last_status: Option<ExecutionStatus>,

    /// Error that stopped the session, if one did
    last_error: Option<FetchError>,

    consecutive_failures: u32,

    /// Fetch results applied so far
    fetches: u64,
}

impl TailSession {
    pub fn new(owner: OwnerRef, policy: &TailPolicy) -> Self {
        Self {
            owner,
            max_consecutive_failures: policy.max_consecutive_failures.max(1),
            state: SessionState::Idle,
            cursor: Cursor::START,
            previous_next_cursor: None,
            transcript: Vec::new(),
            last_status: None,
            last_error: None,
            consecutive_failures: 0,
            fetches: 0,
        }
    }

    pub fn owner(&self) -> &OwnerRef {
        &self.owner
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn last_status(&self) -> Option<ExecutionStatus> {
        self.last_status
    }

    /// The error that stopped the session. Failures that were retried are
    /// not reported here.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetches
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.state, SessionState::Stopped(_))
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.state {
            SessionState::Stopped(reason) => Some(reason),
            _ => None,
        }
    }

    /// Apply one fetch result.
    ///
    /// Results arriving after the session stopped are ignored.
    pub fn apply(&mut self, result: Result<FetchBatch, FetchError>) -> Step {
        if let SessionState::Stopped(reason) = self.state {
            debug!(owner = %self.owner, "ignoring fetch result for stopped session");
            return Step::Stop(reason);
        }

        self.fetches += 1;

        match result.and_then(|batch| self.validate(batch)) {
            Ok(batch) => self.apply_batch(batch),
            Err(err) => self.apply_failure(err),
        }
    }

    fn validate(&self, batch: FetchBatch) -> Result<FetchBatch, FetchError> {
        self.cursor
            .advance_to(batch.next_cursor)
            .map_err(|e| FetchError::ProtocolViolation(e.to_string()))?;

        if let Some(status) = batch.status {
            if status.kind() != self.owner.kind {
                return Err(FetchError::ProtocolViolation(format!(
                    "{} status {} reported for {}",
                    status.kind(),
                    status,
                    self.owner
                )));
            }
        }

        Ok(batch)
    }

    fn apply_batch(&mut self, batch: FetchBatch) -> Step {
        let FetchBatch {
            lines,
            next_cursor,
            status,
        } = batch;

        debug!(
            owner = %self.owner,
            from = %self.cursor,
            to = %next_cursor,
            lines = lines.len(),
            status = ?status,
            "applied fetch"
        );

        let previous = match status {
            Some(_) => self.previous_next_cursor.take(),
            None => self.previous_next_cursor.replace(next_cursor),
        };
        self.transcript.extend(lines);
        self.cursor = next_cursor;
        self.consecutive_failures = 0;
        if status.is_some() {
            self.last_status = status;
        }

        let step = match status {
            Some(status) if classify(status).is_terminal() => {
                Step::Stop(StopReason::Terminal(status))
            }
            Some(_) => Step::Continue,
            None if previous == Some(next_cursor) => Step::Stop(StopReason::Stalled),
            None => Step::Continue,
        };

        self.transition(step)
    }

    fn apply_failure(&mut self, err: FetchError) -> Step {
        let step = if err.is_fatal() {
            Step::Stop(StopReason::NotFound)
        } else {
            self.consecutive_failures += 1;

            if let FetchError::ProtocolViolation(detail) = &err {
                error!(
                    owner = %self.owner,
                    kind = "protocol_violation",
                    failures = self.consecutive_failures,
                    "{detail}"
                );
            } else {
                warn!(
                    owner = %self.owner,
                    failures = self.consecutive_failures,
                    "fetch failed: {err}"
                );
            }

            if self.consecutive_failures >= self.max_consecutive_failures {
                Step::Stop(StopReason::Unavailable)
            } else {
                Step::Continue
            }
        };

        if let Step::Stop(_) = step {
            self.last_error = Some(err);
        }

        self.transition(step)
    }

    fn transition(&mut self, step: Step) -> Step {
        self.state = match step {
            Step::Continue => SessionState::Polling,
            Step::Stop(reason) => {
                info!(
                    owner = %self.owner,
                    reason = ?reason,
                    lines = self.transcript.len(),
                    cursor = %self.cursor,
                    "tail session stopped"
                );
                SessionState::Stopped(reason)
            }
        };
        step
    }
}
