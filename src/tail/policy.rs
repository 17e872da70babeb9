//! Polling cadence and failure budget.
//!
//! - `poll_interval`: fetch cadence; the first fetch is immediate
//! - `max_consecutive_failures`: transient/protocol failures in a row before
//!   the session gives up and reports the log stream as unavailable

use std::time::Duration;

/// Default cadence between fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default failure budget.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(3600);
const MAX_FAILURE_BUDGET: u32 = 1000;

/// Tail policy shared by every session a manager opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailPolicy {
    /// Cadence between fetches (default: 5s)
    pub poll_interval: Duration,

    /// Consecutive failures tolerated before stopping (default: 5)
    pub max_consecutive_failures: u32,
}

impl Default for TailPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl TailPolicy {
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Default::default()
        }
    }

    /// Build from optional config values, falling back to defaults.
    pub fn from_config(poll_interval_ms: Option<u64>, max_failures: Option<u32>) -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_consecutive_failures: max_failures.unwrap_or(defaults.max_consecutive_failures),
        }
    }

    pub fn validate(&self) -> Result<(), TailPolicyError> {
        // poll_interval must be in [100ms, 1h]
        if self.poll_interval < MIN_POLL_INTERVAL || self.poll_interval > MAX_POLL_INTERVAL {
            return Err(TailPolicyError::PollIntervalOutOfBounds {
                millis: self.poll_interval.as_millis() as u64,
            });
        }

        // max_consecutive_failures must be in [1, 1000]
        if self.max_consecutive_failures == 0 || self.max_consecutive_failures > MAX_FAILURE_BUDGET {
            return Err(TailPolicyError::FailureBudgetOutOfBounds {
                value: self.max_consecutive_failures,
            });
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TailPolicyError {
    #[error("poll_interval_ms must be in [100, 3600000], got {millis}")]
    PollIntervalOutOfBounds { millis: u64 },

    #[error("max_consecutive_failures must be in [1, 1000], got {value}")]
    FailureBudgetOutOfBounds { value: u32 },
}
